//! Configuration Module
//!
//! Handles loading cache and server settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// How cache keys are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// `prefix:function:<sha256 hex>`
    #[default]
    Hashed,
    /// `prefix:function:arg:arg:name=value`
    Readable,
}

impl FromStr for KeyStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hashed" | "hash" => Ok(KeyStyle::Hashed),
            "readable" | "plain" => Ok(KeyStyle::Readable),
            other => Err(format!("unknown key style '{}'", other)),
        }
    }
}

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the memory backend can hold
    pub max_entries: usize,
    /// Default TTL in seconds for cached calls
    pub default_ttl: u64,
    /// Admin HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
    /// Key rendering style
    pub key_style: KeyStyle,
    /// Collapse concurrent misses on the same key into one computation
    pub collapse_misses: bool,
    /// Maximum wait for another caller's in-flight computation, in milliseconds
    pub lock_timeout_ms: u64,
    /// Drop tag index entries whose keys have expired during each sweep
    pub prune_tags: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `KEY_STYLE` - `hashed` or `readable` (default: hashed)
    /// - `COLLAPSE_MISSES` - `true` to enable stampede protection (default: false)
    /// - `LOCK_TIMEOUT_MS` - Miss lock wait in milliseconds (default: 5000)
    /// - `PRUNE_TAGS` - `true` to prune stale tag entries on sweep (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            key_style: env_or("KEY_STYLE", defaults.key_style),
            collapse_misses: env_or("COLLAPSE_MISSES", defaults.collapse_misses),
            lock_timeout_ms: env_or("LOCK_TIMEOUT_MS", defaults.lock_timeout_ms),
            prune_tags: env_or("PRUNE_TAGS", defaults.prune_tags),
        }
    }

    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// Miss lock wait as a Duration.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 300,
            server_port: 3000,
            cleanup_interval: 1,
            key_style: KeyStyle::Hashed,
            collapse_misses: false,
            lock_timeout_ms: 5000,
            prune_tags: false,
        }
    }
}

// Unparseable values fall back to the default.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
