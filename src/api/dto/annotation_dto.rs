//! Annotation listing request/response types.

use serde::{Deserialize, Serialize};

use crate::domain::Actor;
use crate::error::SyncError;
use crate::service::AnnotationSummary;

/// Query parameters for `GET /api/v1/annotations`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationsQuery {
    /// The learner as an xAPI Agent JSON string, as in the LRS `agent`
    /// parameter.
    pub agent: String,
}

impl AnnotationsQuery {
    /// Decodes the `agent` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidRequest`] if it is not an Agent object
    /// with an identifier.
    pub fn actor(&self) -> Result<Actor, SyncError> {
        let actor: Actor = serde_json::from_str(&self.agent)
            .map_err(|e| SyncError::InvalidRequest(format!("agent: {e}")))?;
        if actor.canonical_id().is_none() {
            return Err(SyncError::InvalidRequest(
                "agent has no identifier".to_string(),
            ));
        }
        Ok(actor)
    }
}

/// Response of `GET /api/v1/annotations`.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationListResponse {
    /// The learner's annotations.
    pub data: Vec<AnnotationSummary>,
    /// Number of entries in `data`.
    pub total: usize,
}
