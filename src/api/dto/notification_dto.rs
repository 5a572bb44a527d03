//! Void notification webhook payload.

use serde::Deserialize;

use crate::domain::{Actor, Statement};

/// Body of `POST /api/v1/notifications/voided`.
#[derive(Debug, Clone, Deserialize)]
pub struct VoidNotification {
    /// The void statement as delivered by the LRS.
    pub statement: Statement,
    /// The signed-in user the delivery layer acts for, if known.
    #[serde(default)]
    pub session_actor: Option<Actor>,
}
