//! Void notification webhook.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::VoidNotification;
use crate::app_state::AppState;
use crate::error::SyncError;

/// `POST /notifications/voided` — Reconcile snapshots after a void.
///
/// # Errors
///
/// Returns [`SyncError::Unauthorized`] (403) when the void actor does not
/// own the voided statement, or [`SyncError::Lrs`] (502) when the store
/// cannot be reached.
pub async fn voided(
    State(state): State<AppState>,
    Json(req): Json<VoidNotification>,
) -> Result<impl IntoResponse, SyncError> {
    let outcome = state
        .reconciler
        .on_void_event_received(&req.statement, req.session_actor.as_ref())
        .await?
        .into_authorized()?;
    Ok(Json(outcome))
}

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/notifications/voided", post(voided))
}
