//! Void Reconciler: keeps snapshot documents consistent with void events.
//!
//! One call to [`VoidReconciler::on_void_event_received`] walks a single
//! void through `Received → OriginalResolved → Authorized →
//! SnapshotUpdated → Done`, or stops early in one of the rejected/skipped
//! outcomes. Calls may run concurrently; rewrites of the same snapshot key
//! are serialized through [`KeyLocks`].

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::access::AccessVerifier;
use crate::domain::{
    Actor, DEFAULT_STATE_ID, EventBus, KeyLocks, SnapshotDocument, SnapshotKey, Statement,
    StatementId, SyncEvent, VerbKind,
};
use crate::error::SyncError;
use crate::lrs::{EventLog, SnapshotStore};

/// Progress of one reconciliation, recorded in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    /// The void event arrived.
    Received,
    /// The voided statement was fetched.
    OriginalResolved,
    /// The void actor owns the voided statement.
    Authorized,
    /// The snapshot was rewritten.
    SnapshotUpdated,
    /// Reconciliation finished.
    Done,
}

impl fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::OriginalResolved => "original_resolved",
            Self::Authorized => "authorized",
            Self::SnapshotUpdated => "snapshot_updated",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why an incoming event was not reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotAVoidReason {
    /// The event is not a void, or does not reference a statement.
    NotAVoid,
    /// The referenced statement does not exist, voided or not.
    OriginalNotFound,
    /// The referenced statement is not an annotation.
    OriginalNotAnnotation,
}

/// Terminal state of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Entries pointing at the voided statement are gone from the snapshot.
    Done {
        /// The statement that was voided.
        voided_statement_id: StatementId,
        /// Entries removed by this call; zero on redelivery.
        removed: usize,
    },
    /// Nothing for this reconciler to do.
    #[serde(rename = "not_a_void")]
    RejectedNotAVoid {
        /// Which check failed.
        reason: NotAVoidReason,
    },
    /// The void actor does not own the voided statement.
    #[serde(rename = "unauthorized")]
    RejectedUnauthorized {
        /// The statement the actor tried to void.
        voided_statement_id: StatementId,
    },
    /// The owner has no snapshot for the activity.
    SkippedNoSnapshot {
        /// The statement that was voided.
        voided_statement_id: StatementId,
    },
}

impl ReconcileOutcome {
    /// Turns [`ReconcileOutcome::RejectedUnauthorized`] into an error for
    /// the transport layer; every other outcome passes through.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Unauthorized`] for a rejected cross-actor void.
    pub fn into_authorized(self) -> Result<Self, SyncError> {
        match self {
            Self::RejectedUnauthorized {
                voided_statement_id,
            } => Err(SyncError::Unauthorized(voided_statement_id.to_string())),
            other => Ok(other),
        }
    }
}

/// Server-side reconciler for void events.
#[derive(Debug)]
pub struct VoidReconciler {
    events: Arc<dyn EventLog>,
    snapshots: Arc<dyn SnapshotStore>,
    locks: Arc<KeyLocks>,
    verifier: AccessVerifier,
    event_bus: EventBus,
    state_id: String,
}

impl VoidReconciler {
    /// Creates a reconciler over the given stores.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventLog>,
        snapshots: Arc<dyn SnapshotStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            events,
            snapshots,
            locks: Arc::new(KeyLocks::new()),
            verifier: AccessVerifier::new(),
            event_bus,
            state_id: DEFAULT_STATE_ID.to_string(),
        }
    }

    /// Reconciles snapshots stored under a document id other than
    /// `annotations`.
    #[must_use]
    pub fn with_state_id(mut self, state_id: impl Into<String>) -> Self {
        self.state_id = state_id.into();
        self
    }

    /// Shares a lock registry with the other writers of the same
    /// documents, such as [`super::MirrorStore`]s in this process.
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<KeyLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Processes one delivered void event.
    ///
    /// `session_actor`, when the delivery layer knows who is signed in,
    /// must match the void actor as well. Rejections are returned as
    /// outcomes; use [`ReconcileOutcome::into_authorized`] to turn an
    /// unauthorized void into an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Lrs`] if the log or the document store cannot
    /// be reached.
    pub async fn on_void_event_received(
        &self,
        event: &Statement,
        session_actor: Option<&Actor>,
    ) -> Result<ReconcileOutcome, SyncError> {
        let stage = ReconcileStage::Received;
        let Some(target) = event.voided_target() else {
            tracing::debug!(statement_id = %event.id, %stage, "not a void, ignoring");
            return Ok(ReconcileOutcome::RejectedNotAVoid {
                reason: NotAVoidReason::NotAVoid,
            });
        };

        let Some(original) = self.resolve_original(target).await? else {
            tracing::warn!(voided_statement_id = %target, %stage, "voided statement not found");
            return Ok(ReconcileOutcome::RejectedNotAVoid {
                reason: NotAVoidReason::OriginalNotFound,
            });
        };
        let Some(activity) = original.activity().filter(|_| original.kind() == VerbKind::Annotated)
        else {
            tracing::debug!(voided_statement_id = %target, verb = %original.verb.id, "voided statement is not an annotation");
            return Ok(ReconcileOutcome::RejectedNotAVoid {
                reason: NotAVoidReason::OriginalNotAnnotation,
            });
        };
        let stage = ReconcileStage::OriginalResolved;

        let owner_ok = self.verifier.authorize(&original.actor, &event.actor).is_allowed();
        let session_ok = session_actor
            .is_none_or(|session| self.verifier.authorize(&event.actor, session).is_allowed());
        if !(owner_ok && session_ok) {
            tracing::warn!(voided_statement_id = %target, void_statement_id = %event.id, %stage, "rejected cross-actor void");
            return Ok(ReconcileOutcome::RejectedUnauthorized {
                voided_statement_id: target,
            });
        }
        let stage = ReconcileStage::Authorized;

        let key = SnapshotKey::with_state_id(
            activity.id.clone(),
            original.actor.clone(),
            self.state_id.clone(),
        );
        let removed = {
            let _guard = self.locks.acquire(&key).await;
            self.remove_from_snapshot(&key, target).await?
        };
        self.locks.prune_idle().await;

        let Some(removed) = removed else {
            tracing::info!(voided_statement_id = %target, activity_id = %key.activity_id, %stage, "no snapshot to reconcile");
            return Ok(ReconcileOutcome::SkippedNoSnapshot {
                voided_statement_id: target,
            });
        };
        tracing::debug!(voided_statement_id = %target, stage = %ReconcileStage::SnapshotUpdated, removed);

        let _ = self.event_bus.publish(SyncEvent::VoidReconciled {
            activity_id: key.activity_id.clone(),
            voided_statement_id: target,
            removed,
            timestamp: Utc::now(),
        });
        tracing::info!(
            voided_statement_id = %target,
            activity_id = %key.activity_id,
            removed,
            stage = %ReconcileStage::Done,
            "void reconciled"
        );
        Ok(ReconcileOutcome::Done {
            voided_statement_id: target,
            removed,
        })
    }

    /// Fetches the voided statement, retrying with voided visibility.
    async fn resolve_original(&self, id: StatementId) -> Result<Option<Statement>, SyncError> {
        if let Some(statement) = self.events.fetch(id, false).await? {
            return Ok(Some(statement));
        }
        Ok(self.events.fetch(id, true).await?)
    }

    /// Drops entries pointing at `target`. Must be called under the key's
    /// lock. `None` means there is no usable snapshot.
    async fn remove_from_snapshot(
        &self,
        key: &SnapshotKey,
        target: StatementId,
    ) -> Result<Option<usize>, SyncError> {
        let Some(value) = self.snapshots.get_document(key).await? else {
            return Ok(None);
        };
        let mut doc = match SnapshotDocument::from_value(value) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(activity_id = %key.activity_id, error = %e, "malformed snapshot, skipping");
                return Ok(None);
            }
        };

        let removed = doc.remove_statement(target);
        if removed > 0 {
            doc.last_modified = Some(Utc::now());
            let value = doc.to_value().map_err(crate::lrs::LrsError::from)?;
            self.snapshots.put_document(key, &value).await?;
        }
        Ok(Some(removed))
    }
}
