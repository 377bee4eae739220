//! Field values and logical field sets
//!
//! A [`FieldSet`] is what callers build and what the facade hands back: a
//! mapping from *logical* field name to a scalar [`FieldValue`]. Logical
//! names are case-insensitive and namespace-insensitive, so `spi:Status`,
//! `STATUS` and `status` all address the same entry.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Raw record as received from the backend, keys in wire representation
pub type WireRecord = Map<String, Value>;

/// Scalar field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer or floating point number
    Number(Number),
    /// Free text
    Text(String),
}

impl FieldValue {
    /// Convert a wire value into a field value
    ///
    /// Arrays and objects are not scalars; they are carried as their
    /// compact JSON text so that they can still be compared and displayed.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Convert into a wire value
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// Check for explicit null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text, if this is a text value
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String-normalized form used for comparisons
    ///
    /// Integral floating point numbers lose their fractional part so that
    /// `25`, `25.0` and `"25"` normalize identically.
    #[must_use]
    pub fn normalized(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => normalize_number(n),
            Self::Text(s) => s.clone(),
        }
    }

    /// String-normalized equality
    ///
    /// When either side is a number, both sides are also compared
    /// numerically, tolerating backends that echo numbers as text.
    #[must_use]
    pub fn matches(&self, observed: &FieldValue) -> bool {
        if self.normalized() == observed.normalized() {
            return true;
        }

        let numeric_side =
            matches!(self, Self::Number(_)) || matches!(observed, Self::Number(_));
        if !numeric_side {
            return false;
        }

        match (as_f64(self), as_f64(observed)) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn normalize_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

fn as_f64(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) => n.as_f64(),
        FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            other => write!(f, "{}", other.normalized()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

/// Canonical logical form of a field name
///
/// Lower-cases the name and drops a single leading `prefix:` namespace.
#[must_use]
pub fn logical_name(name: &str) -> String {
    let trimmed = name.trim();
    let bare = match trimmed.split_once(':') {
        Some((prefix, rest))
            if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            rest
        }
        _ => trimmed,
    };
    bare.to_ascii_lowercase()
}

/// Errors building a field set from caller input
#[derive(Debug, thiserror::Error)]
pub enum FieldSetError {
    /// Input was not valid JSON
    #[error("invalid field JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Input was JSON but not an object of fields
    #[error("field JSON must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// Mapping from logical field name to value
///
/// Insertion order is preserved; it drives payload and header ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet {
    fields: IndexMap<String, FieldValue>,
}

impl FieldSet {
    /// Create empty field set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field (builder style)
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field, returning the previous value
    pub fn insert(&mut self, name: &str, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.fields.insert(logical_name(name), value.into())
    }

    /// Look up a field by any spelling of its name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(&logical_name(name))
    }

    /// Check whether a field is present
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&logical_name(name))
    }

    /// Remove a field
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.shift_remove(&logical_name(name))
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Logical names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate over `(logical name, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse a JSON object such as `{"status": "ACTIVE"}`
    pub fn from_json_str(input: &str) -> Result<Self, FieldSetError> {
        let value: Value = serde_json::from_str(input)?;
        match value {
            Value::Object(map) => Ok(map
                .iter()
                .fold(Self::new(), |set, (k, v)| set.with(k, FieldValue::from_json(v)))),
            Value::Array(_) => Err(FieldSetError::NotAnObject("array")),
            Value::String(_) => Err(FieldSetError::NotAnObject("string")),
            Value::Number(_) => Err(FieldSetError::NotAnObject("number")),
            Value::Bool(_) => Err(FieldSetError::NotAnObject("boolean")),
            Value::Null => Err(FieldSetError::NotAnObject("null")),
        }
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = indexmap::map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
