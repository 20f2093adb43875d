//! Cache Policy Module

use std::time::Duration;

use serde::Serialize;

use crate::keys::CallArgs;

// == Cache Policy ==
/// Where and for how long a wrapped call's results are cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    prefix: String,
    ttl: Duration,
    tags: Vec<String>,
    unordered: bool,
}

impl CachePolicy {
    /// Caches under `prefix` for `ttl`, untagged.
    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
            tags: Vec::new(),
            unordered: false,
        }
    }

    /// Files every result under `tag` so [`Cache::remove_by_tag`] can drop
    /// it. May be called more than once.
    ///
    /// [`Cache::remove_by_tag`]: crate::cache::Cache::remove_by_tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Treats every array inside the arguments as an unordered set when
    /// building keys, for arguments holding `HashSet`s and the like. A bare
    /// collection passed as the whole argument still maps to positional
    /// arguments, whose order is kept; wrap it in a struct.
    pub fn unordered_collections(mut self) -> Self {
        self.unordered = true;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Captures a call's arguments the way this policy keys them.
    pub(crate) fn capture<A: Serialize + ?Sized>(&self, args: &A) -> CallArgs {
        let captured = CallArgs::from_serialize(args);
        if self.unordered {
            captured.sort_arrays()
        } else {
            captured
        }
    }
}
