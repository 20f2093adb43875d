//! Cache Module
//!
//! The memoizing façade: wrapped calls, tag-based and prefix-based
//! invalidation, miss collapsing and statistics.

mod cached;
mod facade;
mod flight;
mod policy;
mod stats;
mod tags;


// Re-export public types
pub use cached::Cached;
pub use facade::{Cache, CacheBuilder, DEFAULT_LOCK_TIMEOUT, DEFAULT_TTL};
pub use flight::{KeyGuard, KeyLocks};
pub use policy::CachePolicy;
pub use stats::{CacheStats, StatsCounter};
pub use tags::TagIndex;
