// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sanitized output tree.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A transmit-safe tree: primitives, strings, arrays and ordered maps only.
#[derive(Debug, Clone, PartialEq)]
pub enum SanitizedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<SanitizedValue>),
    Map(Vec<(String, SanitizedValue)>),
}

impl SanitizedValue {
    /// Look up a key on a map.
    pub fn get(&self, key: &str) -> Option<&SanitizedValue> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Index into an array.
    pub fn at(&self, index: usize) -> Option<&SanitizedValue> {
        match self {
            Self::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Container nesting depth. Scalars are 0, an empty container is 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Array(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            Self::Map(entries) => 1 + entries.iter().map(|(_, v)| v.depth()).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Whether `needle` occurs in any string or key of the tree.
    pub fn contains_text(&self, needle: &str) -> bool {
        match self {
            Self::String(s) => s.contains(needle),
            Self::Array(items) => items.iter().any(|v| v.contains_text(needle)),
            Self::Map(entries) => entries
                .iter()
                .any(|(k, v)| k.contains(needle) || v.contains_text(needle)),
            _ => false,
        }
    }

    /// Convert to a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => serde_json::Value::Object(
                entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for SanitizedValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl Serialize for SanitizedValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) if x.is_finite() => serializer.serialize_f64(*x),
            Self::Float(_) => serializer.serialize_unit(),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SanitizedValue {
        SanitizedValue::Map(vec![
            ("z".to_string(), SanitizedValue::Int(1)),
            (
                "a".to_string(),
                SanitizedValue::Array(vec![SanitizedValue::from("x"), SanitizedValue::Null]),
            ),
        ])
    }

    #[test]
    fn test_serialize_preserves_key_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"z":1,"a":["x",null]}"#);
    }

    #[test]
    fn test_depth() {
        assert_eq!(SanitizedValue::Null.depth(), 0);
        assert_eq!(SanitizedValue::Array(vec![]).depth(), 1);
        assert_eq!(sample().depth(), 2);
    }

    #[test]
    fn test_contains_text() {
        assert!(sample().contains_text("x"));
        assert!(sample().contains_text("z"));
        assert!(!sample().contains_text("missing"));
    }

    #[test]
    fn test_non_finite_float_is_null() {
        let json = serde_json::to_string(&SanitizedValue::Float(f64::NAN)).unwrap();
        assert_eq!(json, "null");
        assert_eq!(SanitizedValue::Float(f64::INFINITY).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_accessors() {
        let value = sample();
        assert_eq!(value.get("a").and_then(|a| a.at(0)).and_then(SanitizedValue::as_str), Some("x"));
        assert!(value.get("missing").is_none());
    }
}
