//! Self-describing nested list values carried by the transport.
//!
//! Accessors never fail: a missing index or a value of the wrong kind reads
//! as the type's default (`0`, `0.0`, empty list). Aggregated event producers
//! send unchecked records, and the adapter passes such values through rather
//! than rejecting the record.

use serde::{Deserialize, Serialize};

/// A single transport value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Double(f64),
    /// Text value.
    Str(String),
    /// Nested list.
    List(Bottle),
    /// Explicit null; also what out-of-range reads return.
    Null,
}

static NULL: Value = Value::Null;

impl Value {
    /// Integer view. Doubles truncate toward zero; anything else is `0`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            Value::Double(v) if v.is_finite() => v.trunc() as i64,
            _ => 0,
        }
    }

    /// Floating point view. Integers widen; anything else is `0.0`.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_double(&self) -> f64 {
        match self {
            Value::Double(v) => *v,
            Value::Int(v) => *v as f64,
            _ => 0.0,
        }
    }

    /// Nested list view, `None` when the value is not a list.
    pub fn as_list(&self) -> Option<&Bottle> {
        match self {
            Value::List(b) => Some(b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<Bottle> for Value {
    fn from(v: Bottle) -> Self {
        Value::List(v)
    }
}

/// Ordered list of [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bottle(Vec<Value>);

impl Bottle {
    /// Empty bottle.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a value.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    /// Number of top-level values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bottle holds no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value at `idx`, or [`Value::Null`] when out of range.
    pub fn get(&self, idx: usize) -> &Value {
        self.0.get(idx).unwrap_or(&NULL)
    }

    /// Iterate over top-level values.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl From<Vec<Value>> for Bottle {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl<'a> IntoIterator for &'a Bottle {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
