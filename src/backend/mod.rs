//! Backend Module
//!
//! Key/value storage with TTL expiry and prefix-scan deletion. The cache
//! façade only talks to storage through the [`Backend`] trait, so any store
//! offering these four operations can be plugged in.

mod clock;
mod entry;
mod lru;
mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use memory::{MemoryBackend, MemoryStore};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Backend Trait ==
/// Time-bounded storage of serialized values.
///
/// Implementations report transient outages as
/// [`CacheError::BackendUnavailable`](crate::error::CacheError::BackendUnavailable).
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Returns the stored value, or `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value`, replacing any existing entry; it expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Removes one entry. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every entry whose key starts with `prefix` and returns how many.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<usize>;
}
