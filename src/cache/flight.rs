//! Key Locks Module
//!
//! Per-key async locks that let concurrent misses on one key wait for a
//! single computation instead of all recomputing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

type LockMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

// == Key Locks ==
/// Lazily created lock per cache key. A key's lock is dropped from the map
/// as soon as nobody holds or waits for it.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits up to `timeout` for the lock on `key`.
    ///
    /// Returns `None` on timeout. The returned guard releases the lock when
    /// dropped, including when the task holding it is cancelled or the
    /// computation fails.
    pub async fn acquire(&self, key: &str, timeout: Duration) -> Option<KeyGuard> {
        let lock = lock_map(&self.locks)
            .entry(key.to_string())
            .or_default()
            .clone();
        let slot = Slot {
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
        };

        match tokio::time::timeout(timeout, lock.lock_owned()).await {
            Ok(guard) => Some(KeyGuard {
                _guard: guard,
                _slot: slot,
            }),
            Err(_) => None,
        }
    }

    /// Number of keys with a holder or waiter.
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        lock_map(&self.locks).is_empty()
    }
}

// == Key Guard ==
/// Exclusive hold on one key. Field order matters: the mutex guard is
/// released before the slot tries to clean up the map.
#[derive(Debug)]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
    _slot: Slot,
}

// Interest in a key's lock; the last one out removes the map entry.
#[derive(Debug)]
struct Slot {
    key: String,
    locks: Arc<Mutex<LockMap>>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut locks = lock_map(&self.locks);
        let unused = locks
            .get(&self.key)
            .map(|lock| Arc::strong_count(lock) == 1)
            .unwrap_or(false);
        if unused {
            locks.remove(&self.key);
        }
    }
}

fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
