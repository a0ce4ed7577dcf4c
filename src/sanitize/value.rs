// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Input model for the sanitizer.
//!
//! Application state reaches the sanitizer as a [`Value`] graph. Lists and
//! maps are shared handles, so a graph may alias nodes or contain cycles.
//! Types that are not plain data opt into structured serialization through
//! the [`Sanitize`] trait; anything else is an opaque handle.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::output::SanitizedValue;

/// Shared, mutable container handle. Identity is the allocation address.
pub type Shared<T> = Arc<RwLock<T>>;

/// Arbitrary application data handed to the telemetry engine.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    List(Shared<Vec<Value>>),
    Map(Shared<Vec<(String, Value)>>),
    Object(Arc<dyn Sanitize>),
    /// A non-serializable handle, identified only by its type name.
    Opaque(Cow<'static, str>),
}

/// Opt-in structured serialization for non-plain types.
pub trait Sanitize: Send + Sync {
    /// Name used in the `[Instance of <Name>]` sentinel.
    fn type_name(&self) -> &str;

    /// Expose a structured view of this object.
    ///
    /// The default keeps the object opaque.
    fn expose(&self) -> Exposure {
        Exposure::Opaque
    }
}

/// What a [`Sanitize`] implementor is willing to expose.
pub enum Exposure {
    /// Not traversed; rendered as `[Instance of <Name>]`.
    Opaque,
    /// A plain view of the object's state.
    Structured(Value),
    /// The object could not be read.
    Unreadable(String),
}

impl Value {
    /// Build a list from any sequence of values.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(Arc::new(RwLock::new(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    /// Build an ordered map from key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(Arc::new(RwLock::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }

    /// An empty map.
    pub fn empty_map() -> Self {
        Self::map(std::iter::empty::<(String, Value)>())
    }

    /// Wrap a type that implements [`Sanitize`].
    pub fn object(object: impl Sanitize + 'static) -> Self {
        Self::Object(Arc::new(object))
    }

    /// An opaque handle of the given type.
    pub fn opaque(type_name: impl Into<Cow<'static, str>>) -> Self {
        Self::Opaque(type_name.into())
    }

    /// Insert or replace a key on a map. Returns false for non-maps or an
    /// unwritable handle.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let Self::Map(handle) = self else {
            return false;
        };
        let Ok(mut entries) = handle.write() else {
            return false;
        };
        let key = key.into();
        let value = value.into();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
        true
    }

    /// Append to a list. Returns false for non-lists or an unwritable handle.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        let Self::List(handle) = self else {
            return false;
        };
        match handle.write() {
            Ok(mut items) => {
                items.push(value.into());
                true
            }
            Err(_) => false,
        }
    }

    /// Look up a key on a map, cloning the entry.
    pub fn get(&self, key: &str) -> Option<Value> {
        let Self::Map(handle) = self else {
            return None;
        };
        let entries = handle.read().ok()?;
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Whether this value is a container (list, map, or object).
    pub fn is_container(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_) | Self::Object(_))
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

// Containers may be cyclic, so Debug never recurses into them.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({})", b),
            Self::Int(i) => write!(f, "Int({})", i),
            Self::Float(x) => write!(f, "Float({})", x),
            Self::String(s) => write!(f, "String({:?})", s),
            Self::Timestamp(ts) => write!(f, "Timestamp({})", ts),
            Self::List(handle) => match handle.try_read() {
                Ok(items) => write!(f, "List(len={})", items.len()),
                Err(_) => f.write_str("List(<locked>)"),
            },
            Self::Map(handle) => match handle.try_read() {
                Ok(entries) => write!(f, "Map(len={})", entries.len()),
                Err(_) => f.write_str("Map(<locked>)"),
            },
            Self::Object(object) => write!(f, "Object({})", object.type_name()),
            Self::Opaque(name) => write!(f, "Opaque({})", name),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        match i64::try_from(i) {
            Ok(i) => Self::Int(i),
            Err(_) => Self::Float(i as f64),
        }
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Self::from(i as u64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::list(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::list(items),
            serde_json::Value::Object(entries) => Self::map(entries),
        }
    }
}

impl From<&SanitizedValue> for Value {
    fn from(value: &SanitizedValue) -> Self {
        match value {
            SanitizedValue::Null => Self::Null,
            SanitizedValue::Bool(b) => Self::Bool(*b),
            SanitizedValue::Int(i) => Self::Int(*i),
            SanitizedValue::Float(x) => Self::Float(*x),
            SanitizedValue::String(s) => Self::String(s.clone()),
            SanitizedValue::Array(items) => Self::list(items.iter().map(Value::from)),
            SanitizedValue::Map(entries) => {
                Self::map(entries.iter().map(|(k, v)| (k.clone(), Value::from(v))))
            }
        }
    }
}
