use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreError;

/// Thread-safe key/value map backing `GET` and the post-WAL-ack mutation
/// path. A single `RwLock` suffices here; fine-grained sharding is left out
/// since this store's target throughput is bounded by fsync, not map
/// contention.
#[derive(Default)]
pub struct Map {
    inner: RwLock<HashMap<String, String>>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(v)` on hit; [`StoreError::KeyNotFound`] on miss. Never blocks
    /// behind a writer's WAL submission — `set`/`del` only take this lock
    /// after their WAL entry has already been acknowledged.
    pub fn get(&self, key: &str) -> Result<String, StoreError> {
        self.lock_read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    /// Insert or replace. Always succeeds — the caller has already made the
    /// mutation durable; applying it to the map before the WAL ack would
    /// let a reader observe a write that a crash could still roll back.
    pub fn set(&self, key: &str, value: &str) {
        self.lock_write().insert(key.to_string(), value.to_string());
    }

    /// Remove if present; [`StoreError::KeyNotFound`] otherwise.
    pub fn del(&self, key: &str) -> Result<(), StoreError> {
        match self.lock_write().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::KeyNotFound(key.to_string())),
        }
    }

    fn lock_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        // A poisoned lock means a prior panic already corrupted state; that
        // is an unrecoverable process invariant violation, not a request
        // error.
        self.inner.read().expect("map lock poisoned")
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        self.inner.write().expect("map lock poisoned")
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock_read().len()
    }
}
