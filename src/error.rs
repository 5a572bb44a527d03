//! Sync error types with HTTP status code mapping.
//!
//! [`SyncError`] is the central error type of the crate. Each variant maps
//! to a numeric error code and an HTTP status so the webhook layer can turn
//! a rejected void into an access-denied response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::AnnotationId;
use crate::lrs::LrsError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "not authorized to void statement ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Crate-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                  |
/// |-----------|---------------------|------------------------------|
/// | 1000–1999 | Caller misuse       | 400 / 404 / 409              |
/// | 2000–2999 | Authorization       | 403 Forbidden                |
/// | 3000–3999 | Server / store      | 500 / 502                    |
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The void actor does not own the statement it tries to void.
    #[error("not authorized to void statement: {0}")]
    Unauthorized(String),

    /// A void was requested for an annotation that was never submitted.
    #[error("nothing to void: annotation {0} has no statement id")]
    NothingToVoid(AnnotationId),

    /// An update or delete targeted an annotation the mirror does not track.
    #[error("annotation not tracked: {0}")]
    NotTracked(AnnotationId),

    /// A create targeted an annotation id the mirror already tracks.
    #[error("annotation already tracked: {0}")]
    AlreadyTracked(AnnotationId),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The LRS could not be reached or refused the request.
    #[error("lrs error: {0}")]
    Lrs(#[from] LrsError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::NothingToVoid(_) => 1002,
            Self::NotTracked(_) => 1003,
            Self::AlreadyTracked(_) => 1004,
            Self::Unauthorized(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Lrs(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::NothingToVoid(_) => StatusCode::BAD_REQUEST,
            Self::NotTracked(_) => StatusCode::NOT_FOUND,
            Self::AlreadyTracked(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::Lrs(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            Self::Lrs(LrsError::Api { status, .. }) => Some(format!("lrs responded {status}")),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
