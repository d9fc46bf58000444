//! Per-table mutual exclusion for schema changes.
//!
//! Schema updates introspect the live table, diff and then alter it. Two
//! updates interleaving those steps on the same table would each diff
//! against a schema the other is changing, so they are serialized per
//! physical table name. Unrelated tables never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of schema locks keyed by `table_id`.
#[derive(Default)]
pub struct SchemaLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SchemaLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive schema access to a table.
    pub async fn lock(&self, table_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(table_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry of a table nobody is holding or waiting on.
    pub fn forget(&self, table_id: &str) {
        self.locks
            .remove_if(table_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of tracked tables.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
