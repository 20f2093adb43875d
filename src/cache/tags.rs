//! Tag Index Module
//!
//! Process-local mapping from tag to the keys cached under it.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

// == Tag Index ==
/// Tag -> set of cache keys.
///
/// Entries never expire on their own. A key whose backend entry is gone may
/// linger here; deleting it again during invalidation is a no-op. The lock
/// is only held for map updates, never across an await.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: Mutex<HashMap<String, HashSet<String>>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `key` under `tag`.
    pub fn add(&self, tag: &str, key: &str) {
        self.lock()
            .entry(tag.to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// Removes the tag and returns the keys it held.
    pub fn take(&self, tag: &str) -> HashSet<String> {
        self.lock().remove(tag).unwrap_or_default()
    }

    /// Puts keys back under a tag, e.g. after a failed invalidation.
    pub fn restore(&self, tag: &str, keys: impl IntoIterator<Item = String>) {
        let mut tags = self.lock();
        let entry = tags.entry(tag.to_string()).or_default();
        entry.extend(keys);
        if entry.is_empty() {
            tags.remove(tag);
        }
    }

    /// Drops one key from every tag and returns the tags it was under. Tags
    /// left empty are removed.
    pub fn detach(&self, key: &str) -> Vec<String> {
        let mut filed_under = Vec::new();
        self.lock().retain(|tag, keys| {
            if keys.remove(key) {
                filed_under.push(tag.clone());
            }
            !keys.is_empty()
        });
        filed_under
    }

    /// Drops the given keys from every tag and returns how many filings went.
    pub fn remove_keys(&self, stale: &HashSet<String>) -> usize {
        let mut removed = 0;
        self.lock().retain(|_, keys| {
            let before = keys.len();
            keys.retain(|key| !stale.contains(key));
            removed += before - keys.len();
            !keys.is_empty()
        });
        removed
    }

    /// Keys currently filed under a tag.
    pub fn keys(&self, tag: &str) -> HashSet<String> {
        self.lock().get(tag).cloned().unwrap_or_default()
    }

    /// Every key filed under any tag.
    pub fn all_keys(&self) -> HashSet<String> {
        self.lock().values().flatten().cloned().collect()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashSet<String>>> {
        self.tags.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
