//! Per-submission advisory locks
//!
//! Serializes mutating operations on the same submission id inside one gateway
//! process. Entries are reference counted through their `Arc` and removed once
//! no holder or waiter remains.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of submission id to its lock
#[derive(Clone, Default)]
pub struct SubmissionLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held lock; releases and prunes the entry on drop
pub struct SubmissionLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    id: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SubmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn acquire(&self, id: &str) -> SubmissionLockGuard {
        let lock = self
            .locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        SubmissionLockGuard {
            guard: Some(lock.lock_owned().await),
            id: id.to_string(),
            locks: self.locks.clone(),
        }
    }

    /// Number of ids currently tracked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for SubmissionLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left means nobody holds or waits
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
