// src/sync.rs

//! Per-key locking for the shared stores (artifact cache, fingerprints).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A set of independent locks, one per key.
///
/// Holding the lock for key `a` never blocks a caller working on key `b`.
/// Lock entries are created on first use and kept for the lifetime of the
/// set; the number of keys is bounded by the coordinates/tasks of one build.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The lock guarding `key`.
    ///
    /// Callers hold the returned handle and lock it with [`guard`]:
    ///
    /// ```ignore
    /// let lock = locks.lock_for(&key);
    /// let _guard = guard(&lock);
    /// ```
    pub fn lock_for(&self, key: &K) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Acquire a lock returned by [`KeyedLocks::lock_for`], ignoring poison.
pub fn guard(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}
