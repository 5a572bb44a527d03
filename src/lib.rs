//! # annotation-sync
//!
//! Keeps learners' text annotations consistent between an append-only xAPI
//! statement log and the mutable per-learner snapshot documents stored next
//! to it in a Learning Record Store.
//!
//! Every create, update, or delete is recorded as an immutable statement; a
//! delete is a *void* referencing the earlier statement. Clients read the
//! snapshot for fast loading, and a server-side reconciler removes voided
//! entries from snapshots when void notifications arrive.
//!
//! ## Architecture
//!
//! ```text
//! Client session                      Notification delivery
//!     │                                   │
//!     ├── MirrorStore (service/)          ├── REST Handlers (api/)
//!     │     └── RecordBuilder             │
//!     │                                   ├── VoidReconciler (service/)
//!     │                                   │     ├── AccessVerifier
//!     │                                   │     └── KeyLocks (domain/)
//!     ├── EventBus (domain/) ◄────────────┤
//!     │                                   │
//!     └──────── EventLog + SnapshotStore (lrs/) ────────┘
//!                  ├── LrsClient (xAPI over HTTP)
//!                  └── InMemoryLrs
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod lrs;
pub mod service;
