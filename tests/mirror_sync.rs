//! Client mirror behaviour against a shared in-memory LRS.

#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use annotation_sync::domain::{Annotation, AnnotationId, SnapshotKey, SyncEvent};
use annotation_sync::lrs::{InMemoryLrs, SnapshotStore};
use annotation_sync::service::LoadResult;
use common::{ACTIVITY, activity, alice, snapshot, state};

#[tokio::test]
async fn create_then_delete_round_trip() {
    let lrs = Arc::new(InMemoryLrs::new());
    let mut mirror = state(&lrs).open_mirror(activity(), alice());

    let Ok(e1) = mirror.create(Annotation::new("a1", "X", "note")).await else {
        panic!("create failed");
    };
    let Some(doc) = snapshot(&lrs, &alice()).await else {
        panic!("snapshot missing after create");
    };
    assert_eq!(doc.annotations.len(), 1);
    assert_eq!(
        doc.get(&AnnotationId::new("a1")).and_then(|a| a.statement_id),
        Some(e1)
    );

    let Ok(Some(_e2)) = mirror.delete(&AnnotationId::new("a1")).await else {
        panic!("delete should submit a void");
    };
    assert!(mirror.annotations().is_empty());
    assert!(lrs.is_voided(e1).await);
    let Some(doc) = snapshot(&lrs, &alice()).await else {
        panic!("snapshot missing after delete");
    };
    assert!(doc.annotations.is_empty());
}

#[tokio::test]
async fn second_device_sees_arrivals_once() {
    let lrs = Arc::new(InMemoryLrs::new());
    let app = state(&lrs);
    let mut laptop = app.open_mirror(activity(), alice());
    let _ = laptop.create(Annotation::new("a1", "X", "note")).await;
    let _ = laptop.create(Annotation::new("a2", "Y", "more")).await;

    let mut events = app.event_bus.subscribe();
    let mut phone = app.open_mirror(activity(), alice());

    let first = phone.load().await;
    assert_eq!(first.result, LoadResult::Merged);
    assert_eq!(first.arrived.len(), 2);
    let collection = phone.annotations().to_vec();

    let second = phone.load().await;
    assert!(second.arrived.is_empty());
    assert_eq!(phone.annotations(), collection.as_slice());

    let Ok(SyncEvent::AnnotationsArrived { annotations, .. }) = events.try_recv() else {
        panic!("expected one arrival notification");
    };
    assert_eq!(annotations.len(), 2);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn remote_copy_wins_for_known_ids() {
    let lrs = Arc::new(InMemoryLrs::new());
    let app = state(&lrs);
    let mut laptop = app.open_mirror(activity(), alice());
    let mut phone = app.open_mirror(activity(), alice());

    let _ = laptop.create(Annotation::new("a1", "X", "note")).await;
    let _ = phone.load().await;
    let _ = laptop.update(Annotation::new("a1", "X", "edited on laptop")).await;

    let report = phone.load().await;
    assert!(report.arrived.is_empty());
    let Some(local) = phone.get(&AnnotationId::new("a1")) else {
        panic!("a1 missing on phone");
    };
    assert_eq!(local.text, "edited on laptop");
    assert_eq!(
        local.statement_id,
        laptop.get(&AnnotationId::new("a1")).and_then(|a| a.statement_id)
    );
}

#[tokio::test]
async fn unpersisted_local_annotation_survives_load() {
    let lrs = Arc::new(InMemoryLrs::new());
    let app = state(&lrs);
    let mut other = app.open_mirror(activity(), alice());
    let _ = other.create(Annotation::new("remote", "R", "from elsewhere")).await;

    let mut mirror = app.open_mirror(activity(), alice());
    lrs.set_reject_submissions(true).await;
    assert!(mirror.create(Annotation::new("local", "L", "offline")).await.is_err());
    lrs.set_reject_submissions(false).await;

    let report = mirror.load().await;
    assert_eq!(report.result, LoadResult::Merged);
    assert!(mirror.get(&AnnotationId::new("local")).is_some());
    assert!(mirror.get(&AnnotationId::new("remote")).is_some());
}

#[tokio::test]
async fn malformed_snapshot_is_an_explicit_fallback() {
    let lrs = Arc::new(InMemoryLrs::new());
    let key = SnapshotKey::new(ACTIVITY, alice());
    let _ = lrs
        .put_document(&key, &serde_json::json!({"annotations": "not a list"}))
        .await;

    let mut mirror = state(&lrs).open_mirror(activity(), alice());
    let report = mirror.load().await;
    assert!(matches!(report.result, LoadResult::EmptyFallback { .. }));
    assert!(mirror.annotations().is_empty());
}

#[tokio::test]
async fn legacy_snapshot_field_names_are_read() {
    let lrs = Arc::new(InMemoryLrs::new());
    let key = SnapshotKey::new(ACTIVITY, alice());
    let _ = lrs
        .put_document(
            &key,
            &serde_json::json!({
                "highlights": [{"id": "old", "quote": "Q", "text": "T", "statement_id": null}],
                "date_created": "2023-01-02T03:04:05Z"
            }),
        )
        .await;

    let mut mirror = state(&lrs).open_mirror(activity(), alice());
    let report = mirror.load().await;
    assert_eq!(report.result, LoadResult::Merged);
    assert_eq!(report.arrived.len(), 1);
}
