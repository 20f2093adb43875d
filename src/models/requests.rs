//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// What an invalidation request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationTarget {
    Prefix(String),
    Tag(String),
    Key(String),
}

/// Request body for POST /invalidate
///
/// Exactly one of the fields must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    /// Remove every entry whose key starts with this prefix
    #[serde(default)]
    pub prefix: Option<String>,
    /// Remove every entry cached under this tag
    #[serde(default)]
    pub tag: Option<String>,
    /// Remove a single entry
    #[serde(default)]
    pub key: Option<String>,
}

impl InvalidateRequest {
    /// Resolves the request into a single target.
    ///
    /// Returns an error message if zero or several targets are given, or if
    /// the target is empty.
    pub fn target(&self) -> Result<InvalidationTarget, String> {
        let mut targets = Vec::new();
        if let Some(prefix) = &self.prefix {
            targets.push(InvalidationTarget::Prefix(prefix.clone()));
        }
        if let Some(tag) = &self.tag {
            targets.push(InvalidationTarget::Tag(tag.clone()));
        }
        if let Some(key) = &self.key {
            targets.push(InvalidationTarget::Key(key.clone()));
        }

        if targets.len() != 1 {
            return Err("Exactly one of 'prefix', 'tag' or 'key' must be set".to_string());
        }
        let target = targets.remove(0);
        let value = match &target {
            InvalidationTarget::Prefix(v) | InvalidationTarget::Tag(v) | InvalidationTarget::Key(v) => v,
        };
        if value.is_empty() {
            // An empty prefix would match every entry.
            return Err("Invalidation target cannot be empty".to_string());
        }
        Ok(target)
    }
}
