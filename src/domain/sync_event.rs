//! Notifications published after mirror mutations and reconciliations.
//!
//! The surrounding UI subscribes to these through the
//! [`super::EventBus`]; [`SyncEvent::AnnotationsArrived`] is the arrival
//! notification it renders without a full reload.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Annotation, AnnotationId, StatementId};

/// Which mirror mutation produced a persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// A new annotation was added.
    Created,
    /// An existing annotation was changed.
    Updated,
    /// An annotation was removed.
    Deleted,
}

/// Event emitted on the bus.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Remote annotations unknown locally were merged in by a load.
    AnnotationsArrived {
        /// Activity the annotations belong to.
        activity_id: String,
        /// The newly-merged annotations.
        annotations: Vec<Annotation>,
        /// Merge timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The mirror wrote its collection as the new snapshot.
    SnapshotPersisted {
        /// Activity the snapshot belongs to.
        activity_id: String,
        /// Annotation whose mutation triggered the write.
        annotation_id: AnnotationId,
        /// Mutation that triggered the write.
        mutation: MutationKind,
        /// Number of annotations in the written snapshot.
        annotation_count: usize,
        /// Write timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The reconciler removed voided entries from a snapshot.
    VoidReconciled {
        /// Activity whose snapshot was rewritten.
        activity_id: String,
        /// The statement that was voided.
        voided_statement_id: StatementId,
        /// Number of removed entries.
        removed: usize,
        /// Reconciliation timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SyncEvent {
    /// Returns the activity this event concerns.
    #[must_use]
    pub fn activity_id(&self) -> &str {
        match self {
            Self::AnnotationsArrived { activity_id, .. }
            | Self::SnapshotPersisted { activity_id, .. }
            | Self::VoidReconciled { activity_id, .. } => activity_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::AnnotationsArrived { .. } => "annotations_arrived",
            Self::SnapshotPersisted { .. } => "snapshot_persisted",
            Self::VoidReconciled { .. } => "void_reconciled",
        }
    }
}
