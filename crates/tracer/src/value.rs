// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Tag and log-field values.

use std::fmt;

/// A tag or log-field value. Spans accept a small closed set of scalar
/// kinds rather than an arbitrary `Any`, so a backend can format them
/// without reflection.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Unsigned integer value.
    UInt(u64),
    /// Floating point value.
    Float(f64),
    /// String value.
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// A named value attached to a span or a log record.
pub type Tag = (String, Value);
/// An ordered collection of tags. Order is preserved for output, but tags
/// are not deduplicated by name — later tags with the same name simply add
/// another entry, matching an append-only log.
pub type Tags = Vec<Tag>;

/// Build a [`Tags`] vector from `(name, value)` pairs, converting each value
/// through [`Into<Value>`].
#[macro_export]
macro_rules! tags {
    ($($name:expr => $value:expr),* $(,)?) => {
        vec![$(($name.to_string(), $crate::Value::from($value))),*]
    };
}
