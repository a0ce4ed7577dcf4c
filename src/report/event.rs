// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Outbound event records.

use std::fmt;

use serde::Serialize;

use crate::ids::{SpanId, TraceId};
use crate::sanitize::SanitizedValue;

use super::classify::ReportedError;

/// Severity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// What produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// `report_error`.
    Error,
    /// `report_info` / `report_warning`.
    Message,
    /// A timer that was ended normally.
    Performance,
    /// Emitted by the engine itself: overflow, eviction, expiry, leaks.
    Diagnostic,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Message => "message",
            Self::Performance => "performance",
            Self::Diagnostic => "diagnostic",
        })
    }
}

/// A finished, sanitized record handed to a sink exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub level: Level,
    pub kind: EventKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub trace_id: TraceId,
    pub span_id: Option<SpanId>,
    /// Open span names at the time of the record, oldest first.
    pub span_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SanitizedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportedError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    pub timestamp_millis: i64,
}

impl EventRecord {
    /// Whether the engine emitted this record about its own state.
    pub fn is_diagnostic(&self) -> bool {
        self.kind == EventKind::Diagnostic
    }

    /// Encode as a single line of JSON.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EventRecord {
        EventRecord {
            level: Level::Info,
            kind: EventKind::Performance,
            message: "Timer: load took 12ms".to_string(),
            context: None,
            trace_id: "550e8400-e29b-41d4-a716-446655440000".parse().unwrap(),
            span_id: Some("0000abcd".parse().unwrap()),
            span_chain: vec!["home".to_string()],
            metadata: None,
            error: None,
            duration_ms: Some(12.5),
            timestamp_millis: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_record_json_shape() {
        insta::assert_snapshot!(
            record().to_json_line().unwrap(),
            @r#"{"level":"info","kind":"performance","message":"Timer: load took 12ms","traceId":"550e8400-e29b-41d4-a716-446655440000","spanId":"0000abcd","spanChain":["home"],"durationMs":12.5,"timestampMillis":1700000000000}"#
        );
    }

    #[test]
    fn test_span_id_null_when_no_span() {
        let mut record = record();
        record.span_id = None;
        record.span_chain.clear();
        let json: serde_json::Value = serde_json::from_str(&record.to_json_line().unwrap()).unwrap();
        assert!(json["spanId"].is_null());
        assert_eq!(json["spanChain"], serde_json::json!([]));
    }

    #[test]
    fn test_level_display() {
        assert_eq!(Level::Warning.to_string(), "warning");
        assert_eq!(EventKind::Diagnostic.to_string(), "diagnostic");
        assert!(!record().is_diagnostic());
    }
}
