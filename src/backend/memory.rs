//! Memory Backend Module
//!
//! In-process backend combining HashMap storage with LRU capacity eviction
//! and TTL expiration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{
    Backend, CacheEntry, Clock, LruTracker, SystemClock, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::error::{CacheError, Result};

// == Memory Store ==
/// Synchronous storage behind [`MemoryBackend`].
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Entries dropped to make room
    evictions: u64,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` entries.
    pub fn new(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            max_entries,
            evictions: 0,
            clock,
        }
    }

    // == Set ==
    /// Stores a value, resetting its TTL if the key already exists.
    ///
    /// When the store is full the least recently used entry is evicted.
    pub fn set(&mut self, key: &str, value: String, ttl: Duration) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        if self.max_entries == 0 {
            return Err(CacheError::InvalidRequest(
                "Store has no capacity (max_entries is 0)".to_string(),
            ));
        }

        let is_overwrite = self.entries.contains_key(key);
        if !is_overwrite && self.entries.len() >= self.max_entries {
            // Prefer reclaiming expired entries over evicting live ones.
            self.cleanup_expired();
        }
        while !is_overwrite && self.entries.len() >= self.max_entries {
            match self.lru.evict_oldest() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                    self.evictions += 1;
                    debug!(key = %evicted, "evicted least recently used entry");
                }
                None => {
                    return Err(CacheError::Internal(
                        "store is full but has nothing to evict".to_string(),
                    ))
                }
            }
        }

        let entry = CacheEntry::new(value, ttl, self.clock.now_ms());
        self.entries.insert(key.to_string(), entry);
        self.lru.touch(key);
        Ok(())
    }

    // == Get ==
    /// Returns the value if present and not expired. Expired entries are
    /// dropped on the way.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = self.clock.now_ms();
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.remove(key);
            return None;
        }

        self.lru.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Delete ==
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove(key)
    }

    // == Delete By Prefix ==
    /// Removes every key starting with `prefix`, expired or not.
    pub fn delete_by_prefix(&mut self, prefix: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        for key in &matching {
            self.remove(key);
        }
        matching.len()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Remaining lifetime of a live entry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.ttl_remaining(now))
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }
}

// == Memory Backend ==
/// Shared, async handle over a [`MemoryStore`]. Clones share the same data.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryBackend {
    /// Creates a backend on the system clock.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    /// Creates a backend on a caller-provided clock.
    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(max_entries, clock))),
        }
    }

    /// Removes expired entries and returns how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        self.store.read().await.ttl(key)
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn evictions(&self) -> u64 {
        self.store.read().await.evictions()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // Write lock: reads touch the LRU order and may drop expired entries.
        Ok(self.store.write().await.get(key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.store.write().await.set(key, value, ttl)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.store.write().await.delete(key))
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        Ok(self.store.write().await.delete_by_prefix(prefix))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ManualClock;

    const TTL: Duration = Duration::from_secs(300);

    fn store_with_clock(max_entries: usize) -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        (MemoryStore::new(max_entries, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_store_set_and_get() {
        let (mut store, _) = store_with_clock(100);

        store.set("key1", "value1".to_string(), TTL).unwrap();

        assert_eq!(store.get("key1").as_deref(), Some("value1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let (mut store, _) = store_with_clock(100);
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_delete() {
        let (mut store, _) = store_with_clock(100);

        store.set("key1", "value1".to_string(), TTL).unwrap();
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"), "second delete is a no-op");

        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_overwrite_resets_ttl() {
        let (mut store, clock) = store_with_clock(100);

        store
            .set("key1", "value1".to_string(), Duration::from_secs(10))
            .unwrap();
        clock.advance(Duration::from_secs(8));
        store
            .set("key1", "value2".to_string(), Duration::from_secs(10))
            .unwrap();
        clock.advance(Duration::from_secs(8));

        assert_eq!(store.get("key1").as_deref(), Some("value2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let (mut store, clock) = store_with_clock(100);

        store
            .set("key1", "value1".to_string(), Duration::from_secs(1))
            .unwrap();
        assert!(store.get("key1").is_some());

        clock.advance(Duration::from_millis(1_000));

        assert_eq!(store.get("key1"), None);
        assert!(store.is_empty(), "expired entry is dropped on read");
    }

    #[test]
    fn test_store_delete_by_prefix() {
        let (mut store, _) = store_with_clock(100);

        store.set("u:get_user:1", "a".to_string(), TTL).unwrap();
        store.set("u:get_user:2", "b".to_string(), TTL).unwrap();
        store.set("orders:list:1", "c".to_string(), TTL).unwrap();

        assert_eq!(store.delete_by_prefix("u:"), 2);
        assert_eq!(store.delete_by_prefix("u:"), 0);
        assert_eq!(store.len(), 1);
        assert!(store.get("orders:list:1").is_some());
    }

    #[test]
    fn test_store_lru_eviction() {
        let (mut store, _) = store_with_clock(3);

        store.set("key1", "value1".to_string(), TTL).unwrap();
        store.set("key2", "value2".to_string(), TTL).unwrap();
        store.set("key3", "value3".to_string(), TTL).unwrap();
        store.get("key1");
        store.set("key4", "value4".to_string(), TTL).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.evictions(), 1);
        assert!(store.get("key1").is_some());
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn test_store_full_prefers_expired_entries() {
        let (mut store, clock) = store_with_clock(2);

        store
            .set("short", "s".to_string(), Duration::from_secs(1))
            .unwrap();
        store.set("long", "l".to_string(), TTL).unwrap();
        clock.advance(Duration::from_secs(2));
        store.set("new", "n".to_string(), TTL).unwrap();

        assert_eq!(store.evictions(), 0);
        assert!(store.get("long").is_some());
        assert!(store.get("new").is_some());
    }

    #[test]
    fn test_store_cleanup_expired() {
        let (mut store, clock) = store_with_clock(100);

        store
            .set("key1", "value1".to_string(), Duration::from_secs(1))
            .unwrap();
        store
            .set("key2", "value2".to_string(), Duration::from_secs(10))
            .unwrap();
        clock.advance(Duration::from_secs(2));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.ttl("key2"), Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_store_key_too_long() {
        let (mut store, _) = store_with_clock(100);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = store.set(&long_key, "value".to_string(), TTL);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_store_value_too_large() {
        let (mut store, _) = store_with_clock(100);
        let large_value = "x".repeat(MAX_VALUE_SIZE + 1);

        let result = store.set("key", large_value, TTL);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_store_zero_capacity_rejects_writes() {
        let (mut store, _) = store_with_clock(0);

        let result = store.set("key", "value".to_string(), TTL);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_backend_trait_roundtrip() {
        let backend = MemoryBackend::new(10);

        backend.set("k", "v".to_string(), TTL).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(backend.delete("k").await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_backend_clones_share_storage() {
        let backend = MemoryBackend::new(10);
        let other = backend.clone();

        backend.set("k", "v".to_string(), TTL).await.unwrap();
        assert_eq!(other.len().await, 1);
    }
}
