//! Key/value metadata attached to documents and text segments.

use crate::error::{Result, RetrieverError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Numeric view used for cross-type comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a loosely-typed literal: integer, then finite float, then boolean,
    /// else string. `nan` and `inf` stay strings.
    pub fn parse_literal(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(i) = raw.parse::<i64>() {
            MetadataValue::Integer(i)
        } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
            MetadataValue::Float(f)
        } else if let Ok(b) = raw.parse::<bool>() {
            MetadataValue::Boolean(b)
        } else {
            MetadataValue::String(raw.trim_matches('"').to_string())
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Boolean(b) => write!(f, "{b}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(x) => write!(f, "{x}"),
            MetadataValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Integer(value.into())
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Boolean(value)
    }
}

/// Ordered string-keyed metadata map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: BTreeMap<String, MetadataValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Blank keys and non-finite floats are rejected.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        check_entry(&key, &value)?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Builder-style insert for keys and values known to be valid.
    ///
    /// # Panics
    ///
    /// Panics on a blank key or a non-finite float; use [`put`](Self::put) for
    /// untrusted input.
    pub fn with(mut self, key: &'static str, value: impl Into<MetadataValue>) -> Self {
        if let Err(e) = self.put(key, value) {
            panic!("{e}");
        }
        self
    }

    /// Check every entry, as stores do before persisting.
    pub fn validate(&self) -> Result<()> {
        self.entries
            .iter()
            .try_for_each(|(key, value)| check_entry(key, value))
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_str)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(MetadataValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(MetadataValue::as_f64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.entries.remove(key)
    }

    /// Copy every entry of `other` into `self`, overwriting existing keys.
    pub fn merge(&mut self, other: &Metadata) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_entry(key: &str, value: &MetadataValue) -> Result<()> {
    if key.trim().is_empty() {
        return Err(RetrieverError::invalid_argument("metadata key cannot be blank"));
    }
    match value {
        MetadataValue::Float(f) if !f.is_finite() => Err(RetrieverError::invalid_argument(
            format!("metadata value for '{key}' must be finite, but is: {f}"),
        )),
        _ => Ok(()),
    }
}
