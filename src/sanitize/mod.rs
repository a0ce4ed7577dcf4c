// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metadata sanitization.
//!
//! Copies arbitrary application data into a [`SanitizedValue`] that is safe
//! to transmit: bounded in depth, free of cycles, stripped of secrets and of
//! live handles. Sanitization never fails and never panics out to the
//! caller; anything unreadable is replaced by a sentinel string.
//!
//! ```rust
//! use tracekit::sanitize::{sanitize, Value};
//!
//! let user = Value::map([("name", Value::from("ada")), ("password", Value::from("hunter2"))]);
//! user.insert("self", user.clone());
//!
//! let clean = sanitize(&user);
//! assert_eq!(clean.get("password").and_then(|v| v.as_str()), Some("[Stripped]"));
//! assert_eq!(clean.get("self").and_then(|v| v.as_str()), Some("[Circular]"));
//! ```

mod output;
mod redact;
mod value;

pub use output::SanitizedValue;
pub use redact::Redactor;
pub use value::{Exposure, Sanitize, Shared, Value};

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock, TryLockError};

use chrono::SecondsFormat;

/// Default maximum container depth.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Replaces a container that was already visited.
pub const CIRCULAR: &str = "[Circular]";

/// Replaces a container nested deeper than the configured depth.
pub const TRUNCATED: &str = "[Truncated]";

/// Replaces the value under a redacted key.
pub const STRIPPED: &str = "[Stripped]";

/// Replaces a value whose read failed part way.
pub const ACCESS_ERROR: &str = "[Access Error]";

/// Replaces an object that cannot be read at all.
pub const UNSERIALIZABLE: &str = "[Unserializable Object]";

/// Configured sanitizer.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    max_depth: usize,
    redactor: Redactor,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, Redactor::new())
    }
}

impl Sanitizer {
    /// Create a sanitizer with a depth bound and a redactor.
    pub fn new(max_depth: usize, redactor: Redactor) -> Self {
        Self {
            max_depth,
            redactor,
        }
    }

    /// The configured depth bound.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Sanitize a value.
    pub fn sanitize(&self, value: &Value) -> SanitizedValue {
        let mut seen = HashSet::new();
        self.visit(value, 0, &mut seen)
    }

    fn visit(&self, value: &Value, depth: usize, seen: &mut HashSet<usize>) -> SanitizedValue {
        match value {
            Value::Null => SanitizedValue::Null,
            Value::Bool(b) => SanitizedValue::Bool(*b),
            Value::Int(i) => SanitizedValue::Int(*i),
            Value::Float(x) if x.is_finite() => SanitizedValue::Float(*x),
            Value::Float(_) => SanitizedValue::Null,
            Value::String(s) => SanitizedValue::String(s.clone()),
            Value::Timestamp(ts) => {
                SanitizedValue::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Opaque(name) => instance_of(name),
            Value::List(handle) => {
                let items = match self.enter(handle, depth, seen) {
                    Ok(items) => items,
                    Err(sentinel) => return sentinel,
                };
                SanitizedValue::Array(
                    items
                        .iter()
                        .map(|item| self.visit(item, depth + 1, seen))
                        .collect(),
                )
            }
            Value::Map(handle) => {
                let entries = match self.enter(handle, depth, seen) {
                    Ok(entries) => entries,
                    Err(sentinel) => return sentinel,
                };
                SanitizedValue::Map(
                    entries
                        .iter()
                        .map(|(key, item)| {
                            // Redaction short-circuits: the value is never visited.
                            let clean = if self.redactor.is_redacted(key) {
                                SanitizedValue::from(STRIPPED)
                            } else {
                                self.visit(item, depth + 1, seen)
                            };
                            (key.clone(), clean)
                        })
                        .collect(),
                )
            }
            Value::Object(object) => self.visit_object(object, depth, seen),
        }
    }

    /// Depth and cycle checks for a container, then a snapshot of its
    /// contents so no lock is held while recursing.
    fn enter<T: Clone>(
        &self,
        handle: &Arc<RwLock<T>>,
        depth: usize,
        seen: &mut HashSet<usize>,
    ) -> Result<T, SanitizedValue> {
        if depth > self.max_depth {
            return Err(SanitizedValue::from(TRUNCATED));
        }
        if !seen.insert(Arc::as_ptr(handle) as *const () as usize) {
            return Err(SanitizedValue::from(CIRCULAR));
        }
        match handle.try_read() {
            Ok(guard) => Ok(guard.clone()),
            Err(TryLockError::Poisoned(_)) => Err(SanitizedValue::from(UNSERIALIZABLE)),
            Err(TryLockError::WouldBlock) => Err(SanitizedValue::from(ACCESS_ERROR)),
        }
    }

    fn visit_object(
        &self,
        object: &Arc<dyn Sanitize>,
        depth: usize,
        seen: &mut HashSet<usize>,
    ) -> SanitizedValue {
        if depth > self.max_depth {
            return SanitizedValue::from(TRUNCATED);
        }
        if !seen.insert(Arc::as_ptr(object) as *const () as usize) {
            return SanitizedValue::from(CIRCULAR);
        }

        let exposed = panic::catch_unwind(AssertUnwindSafe(|| {
            let name = object.type_name().to_string();
            (name, object.expose())
        }));

        match exposed {
            Ok((name, Exposure::Opaque)) => instance_of(&name),
            // An object exposing another object costs a level, so generated
            // chains of fresh objects still hit the depth bound.
            Ok((_, Exposure::Structured(view @ Value::Object(_)))) => {
                self.visit(&view, depth + 1, seen)
            }
            // Any other view stands in for the object at the same depth.
            Ok((_, Exposure::Structured(view))) => self.visit(&view, depth, seen),
            Ok((name, Exposure::Unreadable(reason))) => {
                tracing::debug!("Unreadable {} during sanitization: {}", name, reason);
                SanitizedValue::from(UNSERIALIZABLE)
            }
            Err(_) => SanitizedValue::from(ACCESS_ERROR),
        }
    }
}

fn instance_of(name: &str) -> SanitizedValue {
    SanitizedValue::String(format!("[Instance of {}]", name))
}

/// Sanitize with the default depth and denylist.
pub fn sanitize(value: &Value) -> SanitizedValue {
    Sanitizer::default().sanitize(value)
}

/// Sanitize with a custom depth bound and the default denylist.
pub fn sanitize_with_depth(value: &Value, max_depth: usize) -> SanitizedValue {
    Sanitizer::new(max_depth, Redactor::new()).sanitize(value)
}
