//! Per-snapshot-key mutual exclusion.
//!
//! Snapshot documents are rewritten with read-modify-write against a store
//! that has no transactions. [`KeyLocks`] hands out one
//! [`tokio::sync::Mutex`] per [`SnapshotKey`] so writers of the same
//! document are serialized while writers of different documents run
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::SnapshotKey;

/// Registry of per-key locks.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and a per-entry
/// `Arc<Mutex<()>>` that callers hold across their read-modify-write.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    ///
    /// The returned guard releases the key when dropped.
    pub async fn acquire(&self, key: &SnapshotKey) -> OwnedMutexGuard<()> {
        let lock_id = key.lock_id();
        let existing = self.locks.read().await.get(&lock_id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => Arc::clone(
                self.locks
                    .write()
                    .await
                    .entry(lock_id)
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            ),
        };
        lock.lock_owned().await
    }

    /// Drops entries nobody holds or waits on.
    ///
    /// Returns the number of entries removed.
    pub async fn prune_idle(&self) -> usize {
        let mut map = self.locks.write().await;
        let before = map.len();
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - map.len()
    }

    /// Returns the number of tracked keys.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    /// Returns `true` if no key is tracked.
    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}
