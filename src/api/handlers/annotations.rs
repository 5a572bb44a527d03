//! Annotation listing handler.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{AnnotationListResponse, AnnotationsQuery};
use crate::app_state::AppState;
use crate::error::SyncError;
use crate::service::parse_accept_language;

/// `GET /annotations?agent=<json>` — List a learner's live annotations.
///
/// Activity titles follow the request's `Accept-Language`.
///
/// # Errors
///
/// Returns [`SyncError::InvalidRequest`] for an unusable `agent`, or
/// [`SyncError::Lrs`] if the log cannot be queried.
pub async fn list_annotations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AnnotationsQuery>,
) -> Result<impl IntoResponse, SyncError> {
    let actor = query.actor()?;
    let languages = headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(parse_accept_language)
        .unwrap_or_default();

    let data = state.reports.list(&actor, &languages).await?;
    Ok(Json(AnnotationListResponse {
        total: data.len(),
        data,
    }))
}

/// Annotation routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/annotations", get(list_annotations))
}
