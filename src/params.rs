//! Navigation parameters.
//!
//! This module provides the two types every navigation carries data with:
//!
//! - [`ParamValue`] — a typed value (string, integer, float, bool, nested
//!   map, or opaque blob). Supports nested deserialization via `serde`.
//! - [`Params`] — an **insertion-ordered** map from `String` keys to
//!   [`ParamValue`]s. Supports typed access via [`get_as`](Params::get_as),
//!   and layered merging via [`merge`](Params::merge) where the
//!   higher-priority side wins on key collision.
//!
//! URI-like string values are stored verbatim — the codec in
//! [`url`](crate::url) never touches a value after it lands here, so
//! original percent-encoding is preserved.
//!
//! # Example
//!
//! ```
//! use navigator_core::Params;
//!
//! let mut params = Params::new();
//! params.insert("userId", 42i64);
//! params.insert("name", "Ada");
//!
//! assert_eq!(params.get_int("userId"), Some(42));
//! assert_eq!(params.get_as::<u32>("userId"), Some(42));
//! assert_eq!(params.get_str("name"), Some("Ada"));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ParamValue
// ============================================================================

/// A typed navigation parameter value.
///
/// Values deserialize from JSON with the natural mapping: strings, numbers
/// (integers before floats), booleans, objects (nested [`Params`]), and
/// arrays of numbers as blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// UTF-8 string. Percent-encoded content is preserved verbatim.
    Str(String),
    /// Signed integer (covers both int and long sources).
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Nested parameter map.
    Map(Params),
    /// Opaque byte payload.
    Blob(Vec<u8>),
}

impl ParamValue {
    /// Get the string value, if this is a [`Str`](Self::Str).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer value, if this is an [`Int`](Self::Int).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float value, accepting an integer as well.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the boolean value, if this is a [`Bool`](Self::Bool).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the nested map, if this is a [`Map`](Self::Map).
    pub fn as_map(&self) -> Option<&Params> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the blob payload, if this is a [`Blob`](Self::Blob).
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Map(m) => write!(f, "{{{} entries}}", m.len()),
            Self::Blob(b) => write!(f, "blob({} bytes)", b.len()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Params> for ParamValue {
    fn from(m: Params) -> Self {
        Self::Map(m)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Blob(b)
    }
}

// ============================================================================
// Params
// ============================================================================

/// Insertion-ordered map of navigation parameters.
///
/// Keys are unique; inserting an existing key overwrites its value but keeps
/// the original position.
///
/// # Example
///
/// ```
/// use navigator_core::Params;
///
/// let mut params = Params::new();
/// params.insert("id", "123");
///
/// assert_eq!(params.get_str("id"), Some("123"));
/// assert_eq!(params.get_as::<i32>("id"), Some(123));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    entries: IndexMap<String, ParamValue>,
}

impl Params {
    /// Create empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from `(key, value)` pairs, preserving order.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = Self::new();
        for (k, v) in pairs {
            params.insert(k, v);
        }
        params
    }

    /// Deserialize parameters from a JSON object string.
    ///
    /// Nested objects become nested maps; this is the entry point for the
    /// "nested deserialization" contract.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Get a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Get a string parameter.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Get an integer parameter.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_int()
    }

    /// Get a float parameter (integers widen).
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_float()
    }

    /// Get a boolean parameter.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// Get a nested parameter map.
    pub fn get_map(&self, key: &str) -> Option<&Params> {
        self.get(key)?.as_map()
    }

    /// Get a blob parameter.
    pub fn get_blob(&self, key: &str) -> Option<&[u8]> {
        self.get(key)?.as_blob()
    }

    /// Get a parameter and parse it as a specific type.
    ///
    /// The value is rendered through its `Display` form first, so `"123"`
    /// and `123` both parse as `i32`. Returns `None` if the parameter does
    /// not exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.to_string().parse().ok()
    }

    /// Return `true` if the given key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a parameter, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries.shift_remove(key)
    }

    /// Iterate over all `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.entries.iter()
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Merge two parameter sets; the higher-priority side wins on collision.
    ///
    /// This implements one step of the merge ladder (forwarded params →
    /// path params → explicit params); chain it with [`layered`](Self::layered)
    /// for the full ladder.
    ///
    /// # Example
    ///
    /// ```
    /// use navigator_core::Params;
    ///
    /// let mut low = Params::new();
    /// low.insert("workspaceId", "123");
    /// low.insert("view", "list");
    ///
    /// let mut high = Params::new();
    /// high.insert("projectId", "456");
    /// high.insert("view", "grid");
    ///
    /// let merged = Params::merge(&low, &high);
    /// assert_eq!(merged.get_str("workspaceId"), Some("123"));
    /// assert_eq!(merged.get_str("projectId"), Some("456"));
    /// assert_eq!(merged.get_str("view"), Some("grid"));
    /// ```
    pub fn merge(low: &Params, high: &Params) -> Params {
        let mut merged = low.clone();
        for (key, value) in high.iter() {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Merge a priority ladder, lowest first. The latest writer wins.
    pub fn layered<'a, I>(layers: I) -> Params
    where
        I: IntoIterator<Item = &'a Params>,
    {
        let mut merged = Params::new();
        for layer in layers {
            for (key, value) in layer.iter() {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

// ============================================================================
// Tests
// ============================================================================
