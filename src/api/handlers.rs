//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints.

use axum::{extract::State, Json};

use crate::backend::MemoryBackend;
use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    HealthResponse, InvalidateRequest, InvalidateResponse, InvalidationTarget, StatsResponse,
};

/// Application state shared across all handlers.
///
/// Both handles are cheap clones over shared storage.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The cache façade
    pub cache: Cache,
    /// The backend the cache writes to, for sweeping and figures
    pub backend: MemoryBackend,
}

impl AppState {
    /// Creates a new AppState over an existing cache and its backend.
    pub fn new(cache: Cache, backend: MemoryBackend) -> Self {
        Self { cache, backend }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        let backend = MemoryBackend::new(config.max_entries);
        let cache = Cache::from_config(config, backend.clone());
        Self::new(cache, backend)
    }
}

/// Handler for POST /invalidate
///
/// Removes entries by prefix, by tag or by exact key.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let target = req.target().map_err(CacheError::InvalidRequest)?;

    let response = match target {
        InvalidationTarget::Prefix(prefix) => {
            let removed = state.cache.remove_by_prefix(&prefix).await?;
            InvalidateResponse::new("prefix", prefix, removed)
        }
        InvalidationTarget::Tag(tag) => {
            let removed = state.cache.remove_by_tag(&tag).await?;
            InvalidateResponse::new("tag", tag, removed)
        }
        InvalidationTarget::Key(key) => {
            let removed = state.cache.invalidate_key(&key).await?;
            InvalidateResponse::new("key", key, usize::from(removed))
        }
    };

    Ok(Json(response))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats();
    let total_entries = state.backend.len().await;
    let evictions = state.backend.evictions().await;

    Json(StatsResponse::new(
        &stats,
        total_entries,
        evictions,
        state.cache.tag_count(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
