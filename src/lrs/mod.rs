//! Learning Record Store adapters.
//!
//! The LRS offers two independent mechanisms: an append-only statement
//! log ([`EventLog`]) and a per-key document API ([`SnapshotStore`]).
//! There is no transactional link between them. [`http::LrsClient`] talks to
//! a real LRS over xAPI 1.0.3; [`memory::InMemoryLrs`] implements the same
//! contracts in process.

pub mod http;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Actor, SnapshotKey, Statement, StatementId};

pub use http::LrsClient;
pub use memory::InMemoryLrs;

/// Errors from the LRS adapter layer.
#[derive(Debug, thiserror::Error)]
pub enum LrsError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The LRS returned a non-2xx status code.
    #[error("LRS API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store is unreachable.
    #[error("LRS unavailable: {0}")]
    Unavailable(String),
}

/// Append-only statement log.
///
/// Failures are surfaced to the caller; implementations never retry.
#[async_trait]
pub trait EventLog: Send + Sync + fmt::Debug {
    /// Appends one statement and returns its id.
    ///
    /// The id chosen by the caller is kept as-is.
    async fn submit(&self, statement: &Statement) -> Result<StatementId, LrsError>;

    /// Appends several statements in order, as one request.
    async fn submit_batch(&self, statements: &[Statement]) -> Result<Vec<StatementId>, LrsError>;

    /// Fetches a statement by id.
    ///
    /// With `include_voided == false` a statement that has since been voided
    /// is reported as absent; with `true` only voided statements are
    /// returned.
    async fn fetch(
        &self,
        id: StatementId,
        include_voided: bool,
    ) -> Result<Option<Statement>, LrsError>;

    /// Lists every non-voided statement of `actor` with the given verb.
    async fn fetch_by_actor_and_verb(
        &self,
        actor: &Actor,
        verb_id: &str,
    ) -> Result<Vec<Statement>, LrsError>;
}

/// Mutable per-key JSON documents.
#[async_trait]
pub trait SnapshotStore: Send + Sync + fmt::Debug {
    /// Reads the document, `None` when it does not exist.
    async fn get_document(&self, key: &SnapshotKey) -> Result<Option<Value>, LrsError>;

    /// Replaces the document.
    async fn put_document(&self, key: &SnapshotKey, document: &Value) -> Result<(), LrsError>;
}
