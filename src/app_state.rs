//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::{SyncConfig, UpdatePolicy};
use crate::domain::{Activity, Actor, EventBus, KeyLocks};
use crate::lrs::{EventLog, SnapshotStore};
use crate::service::{AnnotationReport, MirrorStore, VoidReconciler};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Reconciler fed by the void notification webhook.
    pub reconciler: Arc<VoidReconciler>,
    /// Read-side annotation listing.
    pub reports: Arc<AnnotationReport>,
    /// Event bus for sync notifications.
    pub event_bus: EventBus,
    events: Arc<dyn EventLog>,
    snapshots: Arc<dyn SnapshotStore>,
    locks: Arc<KeyLocks>,
    update_policy: UpdatePolicy,
    state_id: String,
}

impl AppState {
    /// Wires the services over one statement log and one document store.
    #[must_use]
    pub fn new(
        config: &SyncConfig,
        events: Arc<dyn EventLog>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let locks = Arc::new(KeyLocks::new());
        let reconciler = VoidReconciler::new(
            Arc::clone(&events),
            Arc::clone(&snapshots),
            event_bus.clone(),
        )
        .with_state_id(config.state_id.clone())
        .with_locks(Arc::clone(&locks));

        Self {
            reconciler: Arc::new(reconciler),
            reports: Arc::new(AnnotationReport::new(Arc::clone(&events))),
            event_bus,
            events,
            snapshots,
            locks,
            update_policy: config.update_policy,
            state_id: config.state_id.clone(),
        }
    }

    /// Opens a mirror for one (activity, actor) pair with the configured
    /// update policy and document id. The mirror shares this state's event
    /// bus and snapshot locks, so its writes never interleave with a
    /// reconciliation of the same key.
    #[must_use]
    pub fn open_mirror(&self, activity: Activity, actor: Actor) -> MirrorStore {
        MirrorStore::new(
            activity,
            actor,
            Arc::clone(&self.events),
            Arc::clone(&self.snapshots),
            self.event_bus.clone(),
        )
        .with_update_policy(self.update_policy)
        .with_state_id(self.state_id.clone())
        .with_locks(Arc::clone(&self.locks))
    }
}
