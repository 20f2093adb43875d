//! tagcache - A tag-indexed response cache
//!
//! Memoizes async computations in a pluggable key/value backend for a bounded
//! time, with bulk invalidation by key prefix or by tag.
//!
//! ```ignore
//! let backend = MemoryBackend::new(1000);
//! let cache = Cache::builder(backend).build();
//!
//! let get_user = cache.cached(
//!     "get_user",
//!     CachePolicy::new("users", Duration::from_secs(60)).tag("users"),
//!     |user_id: u64| async move { load_user(user_id).await },
//! );
//!
//! let user = get_user.call(1).await;
//! cache.remove_by_tag("users").await?;
//! ```

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use backend::{Backend, MemoryBackend};
pub use cache::{Cache, CachePolicy, Cached};
pub use config::Config;
pub use error::{CacheError, Result};
pub use keys::{CacheKey, CallArgs, KeyMaker};
pub use tasks::spawn_cleanup_task;
