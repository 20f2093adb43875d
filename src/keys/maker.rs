//! Key Maker Module
//!
//! Turns a function name, a prefix and call arguments into a cache key.

use std::fmt::{self, Debug};

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::keys::CallArgs;

// == Cache Key ==
/// A rendered cache key. Always starts with `"{prefix}:"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Key Maker Trait ==
/// Renders calls into keys. Equal arguments must always give equal keys.
pub trait KeyMaker: Debug + Send + Sync {
    fn make(&self, function: &str, prefix: &str, args: &CallArgs) -> Result<CacheKey>;
}

// == Hashed Key Maker ==
/// `prefix:function:<sha256 of the canonical call JSON>`.
///
/// The digest covers prefix and function too, so a `:` inside either cannot
/// make two calls share a key.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedKeyMaker;

impl KeyMaker for HashedKeyMaker {
    fn make(&self, function: &str, prefix: &str, args: &CallArgs) -> Result<CacheKey> {
        args.validate()?;
        let canonical = serde_json::to_vec(&(
            prefix,
            function,
            args.positional(),
            args.named_args(),
        ))?;

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        let digest = hex::encode(hasher.finalize());

        Ok(CacheKey(format!("{}:{}:{}", prefix, function, digest)))
    }
}

// == Readable Key Maker ==
/// `prefix:function:arg:arg:name=value`, with every value as compact JSON.
/// A function or argument name that is not a plain identifier is quoted.
///
/// Useful when keys are inspected by hand. Long arguments can push keys past
/// the backend's key length limit, in which case the call runs uncached.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadableKeyMaker;

impl KeyMaker for ReadableKeyMaker {
    fn make(&self, function: &str, prefix: &str, args: &CallArgs) -> Result<CacheKey> {
        args.validate()?;

        let mut key = format!("{}:{}", prefix, render_name(function)?);
        for value in args.positional() {
            key.push(':');
            key.push_str(&render(value)?);
        }
        for (name, value) in args.named_args() {
            key.push(':');
            key.push_str(&render_name(name)?);
            key.push('=');
            key.push_str(&render(value)?);
        }
        Ok(CacheKey(key))
    }
}

fn render(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

// Plain identifiers stay bare; anything else is quoted so it cannot be
// mistaken for a separator.
fn render_name(name: &str) -> Result<String> {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain {
        Ok(name.to_string())
    } else {
        Ok(serde_json::to_string(name)?)
    }
}
