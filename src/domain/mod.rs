//! Domain layer: annotations, statements, snapshots, and coordination
//! primitives.
//!
//! This module holds the data model shared by the client mirror and the
//! server-side reconciler, the event bus used for arrival notifications,
//! and the per-key lock registry that serializes snapshot rewrites.

pub mod actor;
pub mod annotation;
pub mod event_bus;
pub mod key_locks;
pub mod snapshot;
pub mod statement;
pub mod statement_id;
pub mod sync_event;

pub use actor::{Actor, ActorId, AgentAccount};
pub use annotation::{Annotation, AnnotationId};
pub use event_bus::EventBus;
pub use key_locks::KeyLocks;
pub use snapshot::{DEFAULT_STATE_ID, SnapshotDocument, SnapshotKey};
pub use statement::{
    ANNOTATED_VERB_ID, Activity, ActivityDefinition, Statement, StatementObject, StatementResult,
    VOIDED_VERB_ID, Verb, VerbKind, highlight_extension_key,
};
pub use statement_id::StatementId;
pub use sync_event::{MutationKind, SyncEvent};
