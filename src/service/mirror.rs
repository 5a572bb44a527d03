//! Client Mirror Store: the in-process authority for one learner's
//! annotations on one activity.
//!
//! Every mutation follows the pattern: update the local collection →
//! build a statement → submit it → record the new statement id → persist
//! the whole collection as the snapshot → emit an event. Because each
//! persist writes the entire collection, a later write subsumes any
//! earlier one from the same client.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Map;
use serde_json::Value;

use super::record_builder::RecordBuilder;
use crate::config::UpdatePolicy;
use crate::domain::{
    Activity, Actor, Annotation, AnnotationId, EventBus, KeyLocks, MutationKind,
    SnapshotDocument, SnapshotKey, StatementId, SyncEvent,
};
use crate::error::SyncError;
use crate::lrs::{EventLog, SnapshotStore};

/// How a [`MirrorStore::load`] obtained the remote side of the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// A snapshot document was read and merged.
    Merged,
    /// No snapshot exists yet for this key.
    NoSnapshot,
    /// The snapshot could not be read or parsed; it was treated as empty.
    EmptyFallback {
        /// What went wrong.
        reason: String,
    },
}

/// Outcome of a load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// How the remote snapshot was obtained.
    pub result: LoadResult,
    /// Remote annotations that were unknown locally and got appended.
    pub arrived: Vec<Annotation>,
}

/// Local annotation collection for one (activity, actor) pair, mirrored to
/// the LRS.
///
/// Mutating operations take `&mut self`, so they cannot be re-entered while
/// a previous one awaits the network.
#[derive(Debug)]
pub struct MirrorStore {
    key: SnapshotKey,
    builder: RecordBuilder,
    events: Arc<dyn EventLog>,
    snapshots: Arc<dyn SnapshotStore>,
    event_bus: EventBus,
    locks: Arc<KeyLocks>,
    update_policy: UpdatePolicy,
    annotations: Vec<Annotation>,
    remote_extra: Map<String, Value>,
}

impl MirrorStore {
    /// Creates an empty mirror for `actor` annotating `activity`.
    #[must_use]
    pub fn new(
        activity: Activity,
        actor: Actor,
        events: Arc<dyn EventLog>,
        snapshots: Arc<dyn SnapshotStore>,
        event_bus: EventBus,
    ) -> Self {
        let key = SnapshotKey::new(activity.id.clone(), actor.clone());
        Self {
            key,
            builder: RecordBuilder::new(actor, activity),
            events,
            snapshots,
            event_bus,
            locks: Arc::new(KeyLocks::new()),
            update_policy: UpdatePolicy::default(),
            annotations: Vec::new(),
            remote_extra: Map::new(),
        }
    }

    /// Sets how updates are written to the log.
    #[must_use]
    pub fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    /// Serializes snapshot writes with other writers of the same key, such
    /// as a [`super::VoidReconciler`] in the same process.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<KeyLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Stores the snapshot under a document id other than `annotations`.
    #[must_use]
    pub fn with_state_id(mut self, state_id: impl Into<String>) -> Self {
        self.key.state_id = state_id.into();
        self
    }

    /// The snapshot key this mirror reads and writes.
    #[must_use]
    pub fn key(&self) -> &SnapshotKey {
        &self.key
    }

    /// Current local collection, in insertion order.
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Looks up a tracked annotation.
    #[must_use]
    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| &a.id == id)
    }

    fn get_mut(&mut self, id: &AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| &a.id == id)
    }

    /// Merges the remote snapshot into the local collection.
    ///
    /// Known ids take the remote fields; unknown ids are appended and
    /// announced with [`SyncEvent::AnnotationsArrived`]. Local annotations
    /// missing remotely are kept. Read or parse failures degrade to an empty
    /// remote side and are reported as [`LoadResult::EmptyFallback`].
    pub async fn load(&mut self) -> LoadReport {
        let (result, remote) = match self.snapshots.get_document(&self.key).await {
            Ok(None) => (LoadResult::NoSnapshot, Vec::new()),
            Ok(Some(value)) => match SnapshotDocument::from_value(value) {
                Ok(doc) => {
                    self.remote_extra = doc.extra;
                    (LoadResult::Merged, doc.annotations)
                }
                Err(e) => {
                    tracing::warn!(activity_id = %self.key.activity_id, error = %e, "malformed snapshot, treating as empty");
                    (LoadResult::EmptyFallback { reason: e.to_string() }, Vec::new())
                }
            },
            Err(e) => {
                tracing::warn!(activity_id = %self.key.activity_id, error = %e, "snapshot read failed, treating as empty");
                (LoadResult::EmptyFallback { reason: e.to_string() }, Vec::new())
            }
        };

        let mut arrived = Vec::new();
        for incoming in remote {
            match self.get_mut(&incoming.id) {
                Some(local) => local.overwrite_from(&incoming),
                None => {
                    arrived.push(incoming.clone());
                    self.annotations.push(incoming);
                }
            }
        }

        if !arrived.is_empty() {
            let _ = self.event_bus.publish(SyncEvent::AnnotationsArrived {
                activity_id: self.key.activity_id.clone(),
                annotations: arrived.clone(),
                timestamp: Utc::now(),
            });
        }

        tracing::debug!(
            activity_id = %self.key.activity_id,
            arrived = arrived.len(),
            total = self.annotations.len(),
            "snapshot merged"
        );
        LoadReport { result, arrived }
    }

    /// Adds a new annotation, records it in the log, and persists.
    ///
    /// If submission fails the annotation stays local-only and unpersisted.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyTracked`] if the id is already tracked,
    /// or [`SyncError::Lrs`] if submission or the snapshot write fails.
    pub async fn create(&mut self, mut annotation: Annotation) -> Result<StatementId, SyncError> {
        if self.get(&annotation.id).is_some() {
            return Err(SyncError::AlreadyTracked(annotation.id));
        }
        annotation.statement_id = None;
        let statement = self.builder.annotated(&annotation);
        let id = annotation.id.clone();
        self.annotations.push(annotation);

        let statement_id = self.events.submit(&statement).await.inspect_err(|e| {
            tracing::warn!(annotation_id = %id, error = %e, "annotation kept local-only");
        })?;
        if let Some(local) = self.get_mut(&id) {
            local.statement_id = Some(statement_id);
        }

        self.persist(&id, MutationKind::Created).await?;
        tracing::info!(annotation_id = %id, %statement_id, "annotation created");
        Ok(statement_id)
    }

    /// Changes a tracked annotation and records the new version.
    ///
    /// Local fields change immediately; `statement_id` only moves once the
    /// log accepted the new statement.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotTracked`] for an unknown id, or
    /// [`SyncError::Lrs`] if submission or the snapshot write fails.
    pub async fn update(&mut self, annotation: Annotation) -> Result<StatementId, SyncError> {
        let id = annotation.id.clone();
        let Some(local) = self.get_mut(&id) else {
            return Err(SyncError::NotTracked(id));
        };
        let prior = local.statement_id;
        local.overwrite_from(&Annotation {
            statement_id: prior,
            ..annotation
        });
        let current = local.clone();

        let statement = self.builder.annotated(&current);
        let statement_id = match (self.update_policy, prior) {
            (UpdatePolicy::VoidAndRecreate, Some(prior)) => {
                let batch = [self.builder.void_of(prior), statement];
                let ids = self.events.submit_batch(&batch).await?;
                ids.last().copied().ok_or_else(|| {
                    SyncError::Internal("lrs returned no ids for update batch".to_string())
                })?
            }
            _ => self.events.submit(&statement).await?,
        };
        if let Some(local) = self.get_mut(&id) {
            local.statement_id = Some(statement_id);
        }

        self.persist(&id, MutationKind::Updated).await?;
        tracing::info!(annotation_id = %id, %statement_id, superseded = ?prior, "annotation updated");
        Ok(statement_id)
    }

    /// Voids a tracked annotation and removes it locally.
    ///
    /// The snapshot is rewritten right away without waiting for the
    /// server-side reconciler. An annotation that never reached the log is
    /// removed without submitting a void. Returns the void statement id,
    /// if one was submitted.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotTracked`] for an unknown id, or
    /// [`SyncError::Lrs`] if the void submission or the snapshot write
    /// fails. A failed void leaves the annotation in place.
    pub async fn delete(&mut self, id: &AnnotationId) -> Result<Option<StatementId>, SyncError> {
        let Some(local) = self.get(id) else {
            return Err(SyncError::NotTracked(id.clone()));
        };

        let void_id = if local.statement_id.is_some() {
            let statement = self.builder.voided(local)?;
            Some(self.events.submit(&statement).await?)
        } else {
            tracing::debug!(annotation_id = %id, "annotation never submitted, nothing to void");
            None
        };

        self.annotations.retain(|a| &a.id != id);
        self.persist(id, MutationKind::Deleted).await?;
        tracing::info!(annotation_id = %id, void_statement_id = ?void_id, "annotation deleted");
        Ok(void_id)
    }

    async fn persist(&self, id: &AnnotationId, mutation: MutationKind) -> Result<(), SyncError> {
        let mut doc = SnapshotDocument::from_annotations(
            &self.annotations,
            Some(self.builder.activity().clone()),
            Utc::now(),
        );
        doc.extra = self.remote_extra.clone();
        let value = doc.to_value().map_err(crate::lrs::LrsError::from)?;
        {
            let _guard = self.locks.acquire(&self.key).await;
            self.snapshots.put_document(&self.key, &value).await?;
        }
        self.locks.prune_idle().await;

        let _ = self.event_bus.publish(SyncEvent::SnapshotPersisted {
            activity_id: self.key.activity_id.clone(),
            annotation_id: id.clone(),
            mutation,
            annotation_count: doc.annotations.len(),
            timestamp: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::lrs::InMemoryLrs;

    const ACTIVITY: &str = "https://example.org/node/1";

    fn actor() -> Actor {
        Actor::with_email("a@example.org")
    }

    fn mirror(lrs: &Arc<InMemoryLrs>) -> MirrorStore {
        MirrorStore::new(
            Activity::new(ACTIVITY),
            actor(),
            Arc::clone(lrs) as Arc<dyn EventLog>,
            Arc::clone(lrs) as Arc<dyn SnapshotStore>,
            EventBus::new(16),
        )
    }

    async fn remote_doc(lrs: &InMemoryLrs) -> SnapshotDocument {
        let key = SnapshotKey::new(ACTIVITY, actor());
        let Some(value) = lrs.document(&key).await else {
            panic!("snapshot missing");
        };
        let Ok(doc) = SnapshotDocument::from_value(value) else {
            panic!("snapshot malformed");
        };
        doc
    }

    #[tokio::test]
    async fn create_sets_statement_id_and_persists() {
        let lrs = Arc::new(InMemoryLrs::new());
        let mut store = mirror(&lrs);

        let Ok(statement_id) = store.create(Annotation::new("a1", "X", "note")).await else {
            panic!("create failed");
        };

        let local = store.get(&AnnotationId::new("a1"));
        assert_eq!(local.and_then(|a| a.statement_id), Some(statement_id));

        let doc = remote_doc(&lrs).await;
        assert_eq!(doc.annotations.len(), 1);
        assert_eq!(
            doc.get(&AnnotationId::new("a1")).and_then(|a| a.statement_id),
            Some(statement_id)
        );
        assert!(doc.object.is_some());
    }

    #[tokio::test]
    async fn failed_submission_keeps_annotation_local_only() {
        let lrs = Arc::new(InMemoryLrs::new());
        lrs.set_reject_submissions(true).await;
        let mut store = mirror(&lrs);

        let result = store.create(Annotation::new("a1", "X", "note")).await;
        assert!(matches!(result, Err(SyncError::Lrs(_))));
        assert_eq!(store.annotations().len(), 1);
        assert!(store.annotations().iter().all(|a| a.statement_id.is_none()));
        assert_eq!(lrs.document_writes().await, 0);
    }

    #[tokio::test]
    async fn create_twice_is_misuse() {
        let lrs = Arc::new(InMemoryLrs::new());
        let mut store = mirror(&lrs);
        let _ = store.create(Annotation::new("a1", "X", "note")).await;
        let again = store.create(Annotation::new("a1", "Y", "other")).await;
        assert!(matches!(again, Err(SyncError::AlreadyTracked(_))));
    }

    #[tokio::test]
    async fn update_untracked_is_misuse() {
        let lrs = Arc::new(InMemoryLrs::new());
        let mut store = mirror(&lrs);
        let result = store.update(Annotation::new("ghost", "X", "note")).await;
        assert!(matches!(result, Err(SyncError::NotTracked(_))));
        assert_eq!(lrs.statement_count().await, 0);
    }

    #[tokio::test]
    async fn update_resubmits_and_keeps_id() {
        let lrs = Arc::new(InMemoryLrs::new());
        let mut store = mirror(&lrs);
        let Ok(first) = store.create(Annotation::new("a1", "X", "note")).await else {
            panic!("create failed");
        };
        let Ok(second) = store.update(Annotation::new("a1", "X", "better note")).await else {
            panic!("update failed");
        };

        assert_ne!(first, second);
        assert!(!lrs.is_voided(first).await);
        let doc = remote_doc(&lrs).await;
        let Some(entry) = doc.get(&AnnotationId::new("a1")) else {
            panic!("annotation missing from snapshot");
        };
        assert_eq!(entry.text, "better note");
        assert_eq!(entry.statement_id, Some(second));
    }

    #[tokio::test]
    async fn void_and_recreate_policy_voids_prior() {
        let lrs = Arc::new(InMemoryLrs::new());
        let mut store = mirror(&lrs).with_update_policy(UpdatePolicy::VoidAndRecreate);
        let Ok(first) = store.create(Annotation::new("a1", "X", "note")).await else {
            panic!("create failed");
        };
        let Ok(second) = store.update(Annotation::new("a1", "X", "edited")).await else {
            panic!("update failed");
        };

        assert!(lrs.is_voided(first).await);
        assert!(!lrs.is_voided(second).await);
        assert_eq!(lrs.statement_count().await, 3);
    }

    #[tokio::test]
    async fn delete_voids_and_removes() {
        let lrs = Arc::new(InMemoryLrs::new());
        let mut store = mirror(&lrs);
        let Ok(statement_id) = store.create(Annotation::new("a1", "X", "note")).await else {
            panic!("create failed");
        };

        let Ok(Some(_void_id)) = store.delete(&AnnotationId::new("a1")).await else {
            panic!("delete should submit a void");
        };

        assert!(store.annotations().is_empty());
        assert!(lrs.is_voided(statement_id).await);
        assert!(remote_doc(&lrs).await.annotations.is_empty());
    }

    #[tokio::test]
    async fn delete_of_unsubmitted_annotation_skips_void() {
        let lrs = Arc::new(InMemoryLrs::new());
        lrs.set_reject_submissions(true).await;
        let mut store = mirror(&lrs);
        let _ = store.create(Annotation::new("a1", "X", "note")).await;
        lrs.set_reject_submissions(false).await;

        let result = store.delete(&AnnotationId::new("a1")).await;
        assert!(matches!(result, Ok(None)));
        assert!(store.annotations().is_empty());
        assert_eq!(lrs.statement_count().await, 0);
    }

    #[tokio::test]
    async fn failed_void_keeps_annotation() {
        let lrs = Arc::new(InMemoryLrs::new());
        let mut store = mirror(&lrs);
        let _ = store.create(Annotation::new("a1", "X", "note")).await;
        lrs.set_reject_submissions(true).await;

        let result = store.delete(&AnnotationId::new("a1")).await;
        assert!(matches!(result, Err(SyncError::Lrs(_))));
        assert_eq!(store.annotations().len(), 1);
    }

    #[tokio::test]
    async fn load_of_missing_snapshot_is_not_a_fallback() {
        let lrs = Arc::new(InMemoryLrs::new());
        let mut store = mirror(&lrs);
        let report = store.load().await;
        assert_eq!(report.result, LoadResult::NoSnapshot);
        assert!(report.arrived.is_empty());
    }

    #[tokio::test]
    async fn load_read_failure_degrades_to_empty() {
        let lrs = Arc::new(InMemoryLrs::new());
        lrs.set_reject_submissions(true).await;
        let mut store = mirror(&lrs);
        let _ = store.create(Annotation::new("local", "X", "note")).await;
        lrs.set_offline(true).await;

        let report = store.load().await;
        assert!(matches!(report.result, LoadResult::EmptyFallback { .. }));
        assert_eq!(store.annotations().len(), 1);
    }

    #[tokio::test]
    async fn load_preserves_remote_extra_fields_on_persist() {
        let lrs = Arc::new(InMemoryLrs::new());
        let key = SnapshotKey::new(ACTIVITY, actor());
        let _ = lrs
            .put_document(&key, &serde_json::json!({"annotations": [], "theme": "dark"}))
            .await;
        let mut store = mirror(&lrs);
        let _ = store.load().await;
        let _ = store.create(Annotation::new("a1", "X", "note")).await;

        let Some(value) = lrs.document(&key).await else {
            panic!("snapshot missing");
        };
        assert_eq!(value.get("theme"), Some(&serde_json::json!("dark")));
    }

    #[tokio::test]
    async fn persist_waits_for_shared_key_lock() {
        let lrs = Arc::new(InMemoryLrs::new());
        let locks = Arc::new(KeyLocks::new());
        let mut store = mirror(&lrs).with_locks(Arc::clone(&locks));
        let guard = locks.acquire(store.key()).await;

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            store.create(Annotation::new("a1", "X", "note")),
        )
        .await;
        assert!(blocked.is_err());
        assert_eq!(lrs.document_writes().await, 0);

        drop(guard);
        let Ok(_) = store.update(Annotation::new("a1", "X", "later")).await else {
            panic!("update after release failed");
        };
        assert_eq!(lrs.document_writes().await, 1);
    }
}
