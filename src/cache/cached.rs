//! Cached Call Module
//!
//! A computation bundled with its cache, name and policy.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{Cache, CachePolicy};
use crate::error::Result;
use crate::keys::CacheKey;

// == Cached ==
/// A wrapped computation. Build one with [`Cache::cached`].
///
/// ```ignore
/// let get_user = cache.cached(
///     "get_user",
///     CachePolicy::new("users", Duration::from_secs(60)).tag("users"),
///     |q: UserQuery| async move { repo.find(q.user_id).await },
/// );
/// let user = get_user.call(UserQuery { user_id: 1 }).await;
/// ```
#[derive(Debug, Clone)]
pub struct Cached<F> {
    cache: Cache,
    function: String,
    policy: CachePolicy,
    f: F,
}

impl<F> Cached<F> {
    pub(crate) fn new(cache: Cache, function: String, policy: CachePolicy, f: F) -> Self {
        Self {
            cache,
            function,
            policy,
            f,
        }
    }

    /// Returns the cached result for `args`, computing it on a miss.
    pub async fn call<A, T, Fut>(&self, args: A) -> T
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = T>,
        A: Serialize,
        T: Serialize + DeserializeOwned,
    {
        self.cache
            .get_or_compute(&self.function, &self.policy, args, |args| (self.f)(args))
            .await
    }

    /// Like [`Cached::call`] for fallible computations; errors are not cached.
    pub async fn try_call<A, T, E, Fut>(&self, args: A) -> std::result::Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        A: Serialize,
        T: Serialize + DeserializeOwned,
    {
        self.cache
            .get_or_try_compute(&self.function, &self.policy, args, |args| (self.f)(args))
            .await
    }

    /// Drops the cached result for `args`, if any.
    pub async fn invalidate<A: Serialize + ?Sized>(&self, args: &A) -> Result<bool> {
        let key = self.key(args)?;
        self.cache.invalidate_key(key.as_str()).await
    }

    /// The key results for `args` are cached under.
    pub fn key<A: Serialize + ?Sized>(&self, args: &A) -> Result<CacheKey> {
        self.cache.key_for(
            &self.function,
            self.policy.prefix(),
            &self.policy.capture(args),
        )
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use serde::Deserialize;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Serialize)]
    struct UserQuery {
        user_id: u64,
    }

    #[derive(Debug, Serialize)]
    struct TeamQuery {
        member_ids: HashSet<u32>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    #[tokio::test]
    async fn test_call_and_invalidate() {
        let cache = Cache::builder(MemoryBackend::new(100)).build();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let get_user = cache.cached(
            "get_user",
            CachePolicy::new("users", Duration::from_secs(60)).tag("users"),
            move |q: UserQuery| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    User {
                        id: q.user_id,
                        name: format!("user-{}", q.user_id),
                    }
                }
            },
        );

        let first = get_user.call(UserQuery { user_id: 1 }).await;
        let second = get_user.call(UserQuery { user_id: 1 }).await;
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(get_user.invalidate(&UserQuery { user_id: 1 }).await.unwrap());
        assert!(cache.tagged_keys("users").is_empty());

        get_user.call(UserQuery { user_id: 1 }).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_try_call() {
        let cache = Cache::builder(MemoryBackend::new(100)).build();
        let parse = cache.cached(
            "parse",
            cache.policy("nums"),
            |s: String| async move { s.parse::<i64>().map_err(|e| e.to_string()) },
        );

        assert_eq!(parse.try_call("12".to_string()).await, Ok(12));
        assert!(parse.try_call("x".to_string()).await.is_err());
        assert_eq!(cache.stats().stores, 1);
    }

    #[test]
    fn test_key_uses_function_and_prefix() {
        let cache = Cache::builder(MemoryBackend::new(10)).build();
        let wrapped = cache.cached("lookup", cache.policy("p"), |x: u8| async move { x });

        let key = wrapped.key(&5u8).unwrap();
        assert!(key.as_str().starts_with("p:lookup:"));
        assert_eq!(wrapped.function(), "lookup");
        assert_eq!(wrapped.policy().prefix(), "p");
    }

    #[tokio::test]
    async fn test_unordered_collections_hit_for_equal_sets() {
        let cache = Cache::builder(MemoryBackend::new(10)).build();
        let calls = AtomicUsize::new(0);
        let total = cache.cached(
            "total",
            cache.policy("sets").unordered_collections(),
            |q: TeamQuery| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { q.member_ids.iter().sum::<u32>() }
            },
        );

        for _ in 0..5 {
            let query = TeamQuery {
                member_ids: (0..16).collect(),
            };
            assert_eq!(total.call(query).await, 120);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
