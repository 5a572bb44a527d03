//! Service layer: the sync components built on the domain model and the
//! LRS adapters.
//!
//! [`MirrorStore`] runs inside one client session; [`VoidReconciler`] and
//! [`AnnotationReport`] run server-side behind the HTTP API.

pub mod access;
pub mod mirror;
pub mod reconciler;
pub mod record_builder;
pub mod reporting;

pub use access::{AccessDecision, AccessVerifier};
pub use mirror::{LoadReport, LoadResult, MirrorStore};
pub use reconciler::{NotAVoidReason, ReconcileOutcome, ReconcileStage, VoidReconciler};
pub use record_builder::{RecordBuilder, RecordOperation};
pub use reporting::{AnnotationReport, AnnotationSummary, parse_accept_language};
