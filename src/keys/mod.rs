//! Keys Module
//!
//! Deterministic rendering of calls into cache keys.

mod args;
mod finite;
mod maker;

pub use args::CallArgs;
pub use maker::{CacheKey, HashedKeyMaker, KeyMaker, ReadableKeyMaker};

use std::sync::Arc;

use crate::config::KeyStyle;

/// Returns the key maker for a configured style.
pub fn key_maker_for(style: KeyStyle) -> Arc<dyn KeyMaker> {
    match style {
        KeyStyle::Hashed => Arc::new(HashedKeyMaker),
        KeyStyle::Readable => Arc::new(ReadableKeyMaker),
    }
}
