// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trace and span identifiers.
//!
//! Identifiers are random-looking but not cryptographically secure. A rare
//! duplicate only hurts readability of the resulting trace data.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Identifier for one logical session or request flow.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a trace ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Get a short representation (first 8 characters).
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({})", self.short())
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for TraceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl serde::Serialize for TraceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for TraceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Uuid::deserialize(deserializer).map(Self)
    }
}

/// Identifier for one open span, scoped to a single trace.
///
/// Rendered as 8 hex characters. The overflow sentinel is handed out when
/// the span stack is full and renders as `"overflow"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(Repr);

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Repr {
    Token(u32),
    Overflow,
}

impl SpanId {
    /// Generate a new random span ID.
    pub fn new() -> Self {
        // Top 32 bits of a v4 UUID, i.e. its first 8 hex characters.
        Self(Repr::Token((Uuid::new_v4().as_u128() >> 96) as u32))
    }

    /// The sentinel returned when the span stack is at capacity.
    pub const fn overflow() -> Self {
        Self(Repr::Overflow)
    }

    /// Whether this is the overflow sentinel.
    pub fn is_overflow(&self) -> bool {
        matches!(self.0, Repr::Overflow)
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::Token(token) => write!(f, "{:08x}", token),
            Repr::Overflow => f.write_str("overflow"),
        }
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({})", self)
    }
}

impl FromStr for SpanId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "overflow" {
            return Ok(Self::overflow());
        }
        u32::from_str_radix(s, 16).map(|token| Self(Repr::Token(token)))
    }
}

impl serde::Serialize for SpanId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
