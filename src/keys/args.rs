//! Call Arguments Module
//!
//! Captures the arguments of a wrapped call as JSON values so they can be
//! rendered into a cache key.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::keys::finite::ensure_finite;

// == Call Args ==
/// Positional and named arguments of one call.
///
/// Named arguments live in a sorted map, so the order they were supplied in
/// never affects the key. Builder methods never fail; the first rendering
/// problem is remembered and reported by [`CallArgs::validate`].
///
/// Arguments must render the same way every time they are equal. Unordered
/// collections such as `HashSet` serialize in iteration order, so equal sets
/// give different keys and never hit. Use `BTreeSet`, or call
/// [`CallArgs::sort_arrays`] (see [`CachePolicy::unordered_collections`]).
/// NaN and infinite floats are rejected as unserializable.
///
/// [`CachePolicy::unordered_collections`]: crate::cache::CachePolicy::unordered_collections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
    error: Option<CacheError>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures a whole argument value.
    ///
    /// Arrays and tuples become positional arguments, objects and structs
    /// become named arguments, `()` means no arguments and any other value is
    /// a single positional argument.
    pub fn from_serialize<T: Serialize + ?Sized>(args: &T) -> Self {
        match capture(args) {
            Ok(Value::Null) => Self::new(),
            Ok(Value::Array(values)) => Self {
                positional: values,
                ..Self::default()
            },
            Ok(Value::Object(map)) => Self {
                named: map.into_iter().collect(),
                ..Self::default()
            },
            Ok(scalar) => Self {
                positional: vec![scalar],
                ..Self::default()
            },
            Err(err) => Self::failed(CacheError::UnserializableArgument(err)),
        }
    }

    // == Builder ==
    /// Appends a positional argument.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match capture(value) {
            Ok(value) => self.positional.push(value),
            Err(err) => self.record(CacheError::UnserializableArgument(format!(
                "positional argument {}: {}",
                self.positional.len(),
                err
            ))),
        }
        self
    }

    /// Adds a named argument. Supplying the same name twice is an error.
    pub fn named<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> Self {
        if self.named.contains_key(name) {
            self.record(CacheError::DuplicateArgument(name.to_string()));
            return self;
        }
        match capture(value) {
            Ok(value) => {
                self.named.insert(name.to_string(), value);
            }
            Err(err) => self.record(CacheError::UnserializableArgument(format!(
                "argument '{}': {}",
                name, err
            ))),
        }
        self
    }

    /// Sorts every array nested inside the arguments, so sets serialized in
    /// arbitrary order render identically. The order of positional
    /// arguments themselves is kept. Lists whose order matters must not go
    /// through this.
    pub fn sort_arrays(mut self) -> Self {
        self.positional.iter_mut().for_each(sort_nested);
        self.named.values_mut().for_each(sort_nested);
        self
    }

    // == Accessors ==
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named_args(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Reports the first argument that could not be captured.
    pub fn validate(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn failed(err: CacheError) -> Self {
        Self {
            error: Some(err),
            ..Self::default()
        }
    }

    fn record(&mut self, err: CacheError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

fn capture<T: Serialize + ?Sized>(value: &T) -> std::result::Result<Value, String> {
    ensure_finite(value).map_err(|err| err.to_string())?;
    serde_json::to_value(value).map_err(|err| err.to_string())
}

fn sort_nested(value: &mut Value) {
    match value {
        Value::Array(items) => {
            items.iter_mut().for_each(sort_nested);
            items.sort_by_cached_key(|item| item.to_string());
        }
        Value::Object(map) => map.values_mut().for_each(sort_nested),
        _ => {}
    }
}
