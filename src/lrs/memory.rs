//! In-process LRS.
//!
//! Follows the xAPI visibility rules the reconciler depends on: a voided
//! statement disappears from `statementId` lookups and listings and is only
//! reachable through `voidedStatementId`, and a batch is accepted or
//! rejected as a whole. Faults and read latency can be
//! injected to exercise degraded paths and write races.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{EventLog, LrsError, SnapshotStore};
use crate::domain::{Actor, SnapshotKey, Statement, StatementId, VerbKind};

#[derive(Debug, Default)]
struct MemoryState {
    statements: Vec<Statement>,
    voided: HashSet<StatementId>,
    documents: HashMap<String, Value>,
    reject_submissions: bool,
    offline: bool,
    document_writes: usize,
}

/// Statement log and document store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryLrs {
    state: Mutex<MemoryState>,
    read_latency: Option<Duration>,
}

impl InMemoryLrs {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every document read, widening read-modify-write windows.
    #[must_use]
    pub fn with_read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = Some(latency);
        self
    }

    /// Makes statement submissions fail while reads keep working.
    pub async fn set_reject_submissions(&self, reject: bool) {
        self.state.lock().await.reject_submissions = reject;
    }

    /// Makes every operation fail.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Returns a copy of the stored document, bypassing fault injection.
    pub async fn document(&self, key: &SnapshotKey) -> Option<Value> {
        self.state.lock().await.documents.get(&key.lock_id()).cloned()
    }

    /// Number of statements appended so far, voids included.
    pub async fn statement_count(&self) -> usize {
        self.state.lock().await.statements.len()
    }

    /// Number of successful document writes.
    pub async fn document_writes(&self) -> usize {
        self.state.lock().await.document_writes
    }

    /// Returns whether `id` has been voided.
    pub async fn is_voided(&self, id: StatementId) -> bool {
        self.state.lock().await.voided.contains(&id)
    }

    fn check_online(state: &MemoryState) -> Result<(), LrsError> {
        if state.offline {
            return Err(LrsError::Unavailable("in-memory lrs is offline".to_string()));
        }
        Ok(())
    }

    fn append(state: &mut MemoryState, statement: &Statement) -> Result<StatementId, LrsError> {
        if let Some(existing) = state.statements.iter().find(|s| s.id == statement.id) {
            if existing == statement {
                return Ok(statement.id);
            }
            return Err(LrsError::Api {
                status: 409,
                body: format!("statement {} already exists with different content", statement.id),
            });
        }
        if let Some(target) = statement.voided_target() {
            let target_is_void = state
                .statements
                .iter()
                .any(|s| s.id == target && s.kind() == VerbKind::Voided);
            if target_is_void {
                return Err(LrsError::Api {
                    status: 400,
                    body: format!("statement {target} is a voiding statement"),
                });
            }
            state.voided.insert(target);
        }
        state.statements.push(statement.clone());
        Ok(statement.id)
    }
}

#[async_trait]
impl EventLog for InMemoryLrs {
    async fn submit(&self, statement: &Statement) -> Result<StatementId, LrsError> {
        let mut state = self.state.lock().await;
        Self::check_online(&state)?;
        if state.reject_submissions {
            return Err(LrsError::Unavailable("submissions rejected".to_string()));
        }
        Self::append(&mut state, statement)
    }

    async fn submit_batch(&self, statements: &[Statement]) -> Result<Vec<StatementId>, LrsError> {
        let mut state = self.state.lock().await;
        Self::check_online(&state)?;
        if state.reject_submissions {
            return Err(LrsError::Unavailable("submissions rejected".to_string()));
        }
        // Stage against a copy; commit only if every statement is accepted.
        let mut staged = MemoryState {
            statements: state.statements.clone(),
            voided: state.voided.clone(),
            ..MemoryState::default()
        };
        let ids = statements
            .iter()
            .map(|statement| Self::append(&mut staged, statement))
            .collect::<Result<Vec<_>, _>>()?;
        state.statements = staged.statements;
        state.voided = staged.voided;
        Ok(ids)
    }

    async fn fetch(
        &self,
        id: StatementId,
        include_voided: bool,
    ) -> Result<Option<Statement>, LrsError> {
        let state = self.state.lock().await;
        Self::check_online(&state)?;
        if state.voided.contains(&id) != include_voided {
            return Ok(None);
        }
        Ok(state.statements.iter().find(|s| s.id == id).cloned())
    }

    async fn fetch_by_actor_and_verb(
        &self,
        actor: &Actor,
        verb_id: &str,
    ) -> Result<Vec<Statement>, LrsError> {
        let state = self.state.lock().await;
        Self::check_online(&state)?;
        let Some(actor_id) = actor.canonical_id() else {
            return Ok(Vec::new());
        };
        Ok(state
            .statements
            .iter()
            .filter(|s| s.verb.id == verb_id)
            .filter(|s| s.actor.canonical_id().as_ref() == Some(&actor_id))
            .filter(|s| !state.voided.contains(&s.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SnapshotStore for InMemoryLrs {
    async fn get_document(&self, key: &SnapshotKey) -> Result<Option<Value>, LrsError> {
        let document = {
            let state = self.state.lock().await;
            Self::check_online(&state)?;
            state.documents.get(&key.lock_id()).cloned()
        };
        if let Some(latency) = self.read_latency {
            tokio::time::sleep(latency).await;
        }
        Ok(document)
    }

    async fn put_document(&self, key: &SnapshotKey, document: &Value) -> Result<(), LrsError> {
        let mut state = self.state.lock().await;
        Self::check_online(&state)?;
        state.documents.insert(key.lock_id(), document.clone());
        state.document_writes += 1;
        Ok(())
    }
}
