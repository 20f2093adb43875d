//! TTL Sweep Task
//!
//! Background task that periodically purges expired entries from the memory
//! backend and, optionally, stale keys from the tag index.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::MemoryBackend;
use crate::cache::Cache;

/// Spawns a task that sweeps every `interval_secs` seconds.
///
/// Expired entries are unreadable anyway; sweeping only reclaims memory.
/// With `prune_tags` set, each sweep also drops tag index keys whose entries
/// are gone.
///
/// The returned handle can be aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let backend = MemoryBackend::new(1000);
/// let cache = Cache::builder(backend.clone()).build();
/// let sweeper = spawn_cleanup_task(backend, cache, 1, false);
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_cleanup_task(
    backend: MemoryBackend,
    cache: Cache,
    interval_secs: u64,
    prune_tags: bool,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;
            sweep_once(&backend, &cache, prune_tags).await;
        }
    })
}

/// Runs one sweep and returns (expired entries removed, tag keys pruned).
pub async fn sweep_once(backend: &MemoryBackend, cache: &Cache, prune_tags: bool) -> (usize, usize) {
    let removed = backend.cleanup_expired().await;
    if removed > 0 {
        info!("TTL sweep: removed {} expired entries", removed);
    } else {
        debug!("TTL sweep: no expired entries found");
    }

    let pruned = if prune_tags {
        match cache.prune_tags().await {
            Ok(pruned) => pruned,
            Err(err) => {
                warn!(error = %err, "TTL sweep: tag pruning failed");
                0
            }
        }
    } else {
        0
    };
    if pruned > 0 {
        info!("TTL sweep: pruned {} stale tag entries", pruned);
    }

    (removed, pruned)
}
