//! Cache Façade Module
//!
//! Composes a key maker and a backend into memoized calls, and keeps the tag
//! index used for bulk invalidation.

use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::cache::{CachePolicy, CacheStats, Cached, KeyLocks, StatsCounter, TagIndex};
use crate::config::Config;
use crate::error::Result;
use crate::keys::{key_maker_for, CacheKey, CallArgs, HashedKeyMaker, KeyMaker};

/// Default wait for another caller's in-flight computation.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default lifetime of cached results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

// == Cache ==
/// Handle to a cache. Clones share the backend, tag index and counters, so
/// one instance can be built at startup and handed to every call site.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn Backend>,
    key_maker: Arc<dyn KeyMaker>,
    tags: TagIndex,
    locks: KeyLocks,
    stats: StatsCounter,
    collapse_misses: bool,
    lock_timeout: Duration,
    default_ttl: Duration,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("key_maker", &self.inner.key_maker)
            .field("collapse_misses", &self.inner.collapse_misses)
            .field("lock_timeout", &self.inner.lock_timeout)
            .field("default_ttl", &self.inner.default_ttl)
            .field("tags", &self.inner.tags.len())
            .finish()
    }
}

impl Cache {
    // == Constructors ==
    pub fn builder<B: Backend>(backend: B) -> CacheBuilder {
        CacheBuilder::new(Arc::new(backend))
    }

    /// Builds a cache from loaded configuration.
    pub fn from_config<B: Backend>(config: &Config, backend: B) -> Self {
        Self::builder(backend)
            .key_maker(key_maker_for(config.key_style))
            .collapse_misses(config.collapse_misses)
            .lock_timeout(config.lock_timeout())
            .default_ttl(config.default_ttl())
            .build()
    }

    /// A policy under `prefix` using the configured default TTL.
    pub fn policy(&self, prefix: impl Into<String>) -> CachePolicy {
        CachePolicy::new(prefix, self.inner.default_ttl)
    }

    /// Wraps `f` so calls with equal arguments share one cached result.
    ///
    /// `function` names the computation; it is part of every key, so two
    /// wrappers must not share a name unless they compute the same thing.
    /// Arguments holding a `HashSet` need a `BTreeSet` instead, or a policy
    /// with [`CachePolicy::unordered_collections`].
    pub fn cached<F>(&self, function: impl Into<String>, policy: CachePolicy, f: F) -> Cached<F> {
        Cached::new(self.clone(), function.into(), policy, f)
    }

    /// Renders the key a call would be cached under.
    pub fn key_for(&self, function: &str, prefix: &str, args: &CallArgs) -> Result<CacheKey> {
        self.inner.key_maker.make(function, prefix, args)
    }

    // == Get Or Compute ==
    /// Returns the cached result for `args`, or runs `f` and caches its
    /// result.
    ///
    /// Caching never stands in the way of the computation: if no key can be
    /// made or the backend fails, `f` still runs and its result is returned.
    pub async fn get_or_compute<A, T, F, Fut>(
        &self,
        function: &str,
        policy: &CachePolicy,
        args: A,
        f: F,
    ) -> T
    where
        A: Serialize,
        T: Serialize + DeserializeOwned,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = T>,
    {
        let result = self
            .get_or_try_compute(function, policy, args, move |args| {
                let fut = f(args);
                async move { Ok::<T, Infallible>(fut.await) }
            })
            .await;
        match result {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`Cache::get_or_compute`] for fallible computations. Errors are
    /// returned to the caller and never cached.
    pub async fn get_or_try_compute<A, T, E, F, Fut>(
        &self,
        function: &str,
        policy: &CachePolicy,
        args: A,
        f: F,
    ) -> std::result::Result<T, E>
    where
        A: Serialize,
        T: Serialize + DeserializeOwned,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = match self.key_for(function, policy.prefix(), &policy.capture(&args)) {
            Ok(key) => key,
            Err(err) => {
                warn!(function, error = %err, "cannot build cache key, calling uncached");
                self.inner.stats.record_bypass();
                return f(args).await;
            }
        };

        if let Some(value) = self.lookup(&key).await {
            return Ok(value);
        }

        let _guard = if self.inner.collapse_misses {
            match self
                .inner
                .locks
                .acquire(key.as_str(), self.inner.lock_timeout)
                .await
            {
                Some(guard) => {
                    // Someone else may have filled the key while we waited.
                    if let Some(value) = self.lookup(&key).await {
                        return Ok(value);
                    }
                    Some(guard)
                }
                None => {
                    warn!(key = %key, "timed out waiting for in-flight computation");
                    None
                }
            }
        } else {
            None
        };

        self.inner.stats.record_miss();
        debug!(key = %key, "cache miss, computing");

        // The write happens only after `f` completes, so a cancelled call
        // never stores anything.
        let value = f(args).await?;
        self.store(&key, &value, policy).await;
        Ok(value)
    }

    // == Invalidation ==
    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Keys are `prefix:function:...`, so pass `"users:"` to avoid also
    /// matching a `"users_archive"` prefix. The tag index is left as is;
    /// keys it still lists are skipped by later tag invalidations.
    pub async fn remove_by_prefix(&self, prefix: &str) -> Result<usize> {
        match self.inner.backend.delete_by_prefix(prefix).await {
            Ok(removed) => {
                info!(prefix, removed, "removed cache entries by prefix");
                Ok(removed)
            }
            Err(err) => {
                self.inner.stats.record_backend_error();
                warn!(prefix, error = %err, "prefix invalidation failed");
                Err(err)
            }
        }
    }

    /// Removes every entry cached under `tag` and forgets the tag.
    ///
    /// Keys that could not be deleted stay filed under the tag and the
    /// backend error is returned, so a retry picks them up. Filings of the
    /// deleted keys under other tags are left alone: a concurrent miss may
    /// already have re-cached and re-filed them.
    pub async fn remove_by_tag(&self, tag: &str) -> Result<usize> {
        let keys = self.inner.tags.take(tag);
        let mut removed = 0;
        let mut failed = Vec::new();
        let mut last_err = None;

        for key in keys {
            match self.inner.backend.delete(&key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => {
                    failed.push(key);
                    last_err = Some(err);
                }
            }
        }

        if let Some(err) = last_err {
            self.inner.stats.record_backend_error();
            warn!(tag, failed = failed.len(), error = %err, "tag invalidation incomplete");
            self.inner.tags.restore(tag, failed);
            return Err(err);
        }

        info!(tag, removed, "removed cache entries by tag");
        Ok(removed)
    }

    /// Removes a single entry and drops it from every tag.
    ///
    /// The filings go before the delete, so a result re-cached meanwhile
    /// keeps the filings it makes. They are put back if the delete fails.
    pub async fn invalidate_key(&self, key: &str) -> Result<bool> {
        let filed_under = self.inner.tags.detach(key);
        match self.inner.backend.delete(key).await {
            Ok(deleted) => {
                debug!(key, deleted, "invalidated cache key");
                Ok(deleted)
            }
            Err(err) => {
                for tag in &filed_under {
                    self.inner.tags.add(tag, key);
                }
                self.inner.stats.record_backend_error();
                warn!(key, error = %err, "key invalidation failed");
                Err(err)
            }
        }
    }

    /// Drops tag index entries whose keys the backend no longer holds and
    /// returns how many were dropped.
    pub async fn prune_tags(&self) -> Result<usize> {
        let mut stale = HashSet::new();
        for key in self.inner.tags.all_keys() {
            match self.inner.backend.get(&key).await {
                Ok(None) => {
                    stale.insert(key);
                }
                Ok(Some(_)) => {}
                Err(err) => {
                    self.inner.stats.record_backend_error();
                    return Err(err);
                }
            }
        }
        Ok(self.inner.tags.remove_keys(&stale))
    }

    // == Introspection ==
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }

    /// Number of tags with at least one key.
    pub fn tag_count(&self) -> usize {
        self.inner.tags.len()
    }

    /// Keys currently filed under `tag`.
    pub fn tagged_keys(&self, tag: &str) -> HashSet<String> {
        self.inner.tags.keys(tag)
    }

    // == Backend Access ==
    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.inner.backend.get(key.as_str()).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    self.inner.stats.record_hit();
                    debug!(key = %key, "cache hit");
                    Some(value)
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "cached value does not decode, recomputing");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                self.inner.stats.record_backend_error();
                warn!(key = %key, error = %err, "backend read failed, treating as miss");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &CacheKey, value: &T, policy: &CachePolicy) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %key, error = %err, "result does not serialize, not caching");
                return;
            }
        };

        match self.inner.backend.set(key.as_str(), raw, policy.ttl()).await {
            Ok(()) => {
                self.inner.stats.record_store();
                for tag in policy.tags() {
                    self.inner.tags.add(tag, key.as_str());
                }
            }
            Err(err) if err.is_backend() => {
                self.inner.stats.record_backend_error();
                warn!(key = %key, error = %err, "backend write failed, result not cached");
            }
            Err(err) => {
                self.inner.stats.record_bypass();
                warn!(key = %key, error = %err, "backend rejected entry, result not cached");
            }
        }
    }
}

// == Cache Builder ==
/// Configures a [`Cache`]. Defaults: hashed keys, no miss collapsing.
pub struct CacheBuilder {
    backend: Arc<dyn Backend>,
    key_maker: Arc<dyn KeyMaker>,
    collapse_misses: bool,
    lock_timeout: Duration,
    default_ttl: Duration,
}

impl CacheBuilder {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            key_maker: Arc::new(HashedKeyMaker),
            collapse_misses: false,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn key_maker(mut self, key_maker: Arc<dyn KeyMaker>) -> Self {
        self.key_maker = key_maker;
        self
    }

    /// Makes concurrent misses on one key wait for a single computation.
    pub fn collapse_misses(mut self, enabled: bool) -> Self {
        self.collapse_misses = enabled;
        self
    }

    /// Longest a collapsed miss waits before computing on its own.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn build(self) -> Cache {
        Cache {
            inner: Arc::new(Inner {
                backend: self.backend,
                key_maker: self.key_maker,
                tags: TagIndex::new(),
                locks: KeyLocks::new(),
                stats: StatsCounter::new(),
                collapse_misses: self.collapse_misses,
                lock_timeout: self.lock_timeout,
                default_ttl: self.default_ttl,
            }),
        }
    }
}
