//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for POST /invalidate
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Kind of target: "prefix", "tag" or "key"
    pub target: String,
    /// The prefix, tag or key that was invalidated
    pub value: String,
    /// Number of entries removed
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(target: &str, value: impl Into<String>, removed: usize) -> Self {
        Self {
            target: target.to_string(),
            value: value.into(),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Calls answered from the cache
    pub hits: u64,
    /// Calls that had to compute
    pub misses: u64,
    /// Results written to the backend
    pub stores: u64,
    /// Calls that skipped the cache
    pub bypasses: u64,
    /// Failed backend operations
    pub backend_errors: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Entries held by the backend, including expired ones not yet swept
    pub total_entries: usize,
    /// Entries evicted for capacity
    pub evictions: u64,
    /// Tags with at least one key
    pub tags: usize,
}

impl StatsResponse {
    /// Combines façade counters with backend figures.
    pub fn new(stats: &CacheStats, total_entries: usize, evictions: u64, tags: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            stores: stats.stores,
            bypasses: stats.bypasses,
            backend_errors: stats.backend_errors,
            hit_rate: stats.hit_rate(),
            total_entries,
            evictions,
            tags,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_response_serialize() {
        let resp = InvalidateResponse::new("tag", "users", 3);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["target"], "tag");
        assert_eq!(json["value"], "users");
        assert_eq!(json["removed"], 3);
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..CacheStats::default()
        };
        let resp = StatsResponse::new(&stats, 100, 5, 2);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.total_entries, 100);
        assert_eq!(resp.tags, 2);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(&CacheStats::default(), 0, 0, 0);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
