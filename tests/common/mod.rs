//! Shared helpers for integration tests.

#![allow(dead_code, clippy::panic)]

use std::sync::Arc;

use annotation_sync::api;
use annotation_sync::app_state::AppState;
use annotation_sync::config::SyncConfig;
use annotation_sync::domain::{Activity, Actor, SnapshotDocument, SnapshotKey};
use annotation_sync::lrs::{EventLog, InMemoryLrs, SnapshotStore};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const ACTIVITY: &str = "https://example.org/node/1";

pub fn alice() -> Actor {
    Actor::with_email("alice@example.org").named("Alice")
}

pub fn bob() -> Actor {
    Actor::with_email("bob@example.org").named("Bob")
}

pub fn activity() -> Activity {
    Activity::new(ACTIVITY).named("en", "Lesson 1")
}

/// Application state over a fresh in-memory LRS.
pub fn state(lrs: &Arc<InMemoryLrs>) -> AppState {
    AppState::new(
        &SyncConfig::default(),
        Arc::clone(lrs) as Arc<dyn EventLog>,
        Arc::clone(lrs) as Arc<dyn SnapshotStore>,
    )
}

pub fn router(state: AppState) -> Router {
    api::build_router().with_state(state)
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    let Ok(response) = app.oneshot(request).await else {
        panic!("router failed");
    };
    response
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let Ok(collected) = response.into_body().collect().await else {
        panic!("body read failed");
    };
    let Ok(json) = serde_json::from_slice(&collected.to_bytes()) else {
        panic!("body is not json");
    };
    json
}

/// Reads and parses the snapshot of `actor` on [`ACTIVITY`].
pub async fn snapshot(lrs: &InMemoryLrs, actor: &Actor) -> Option<SnapshotDocument> {
    let value = lrs.document(&SnapshotKey::new(ACTIVITY, actor.clone())).await?;
    let Ok(doc) = SnapshotDocument::from_value(value) else {
        panic!("snapshot malformed");
    };
    Some(doc)
}
