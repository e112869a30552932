//! Per-key mutual exclusion.
//!
//! Chunk writes and merges for one upload identifier must not interleave,
//! and two writers must not replace the same finished file at once. Each key
//! gets its own async mutex; entries are dropped when the last holder and
//! waiter are gone, so the table only holds keys that are in use.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Entries = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// A table of named async locks.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    entries: Entries,
}

impl KeyedLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and acquire the lock for `key`.
    ///
    /// Dropping the returned future before it resolves still prunes the
    /// entry once nobody else references it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let prune = Prune {
            key: key.to_owned(),
            entries: Arc::clone(&self.entries),
        };
        let mutex = Arc::clone(&self.entries.entry(key.to_owned()).or_default());
        let guard = mutex.lock_owned().await;
        KeyGuard {
            _guard: guard,
            _prune: prune,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Holds one key's lock until dropped.
#[derive(Debug)]
pub struct KeyGuard {
    // Released before the entry is pruned.
    _guard: OwnedMutexGuard<()>,
    _prune: Prune,
}

/// Removes a key's entry when the last reference to its mutex goes away.
#[derive(Debug)]
struct Prune {
    key: String,
    entries: Entries,
}

impl Drop for Prune {
    fn drop(&mut self) {
        self.entries
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// The two lock namespaces used by storage operations.
///
/// Acquire a session lock before a file lock, never the reverse.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    /// Locks keyed by upload identifier.
    pub sessions: KeyedLocks,
    /// Locks keyed by finished filename.
    pub files: KeyedLocks,
}
