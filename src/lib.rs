// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! tracekit - embedded trace context for client applications.
//!
//! Every reported error, message and timing carries the trace id and the
//! chain of open spans it happened under. Metadata is sanitized before it
//! leaves the process: cycles are broken, depth is bounded, and secrets and
//! navigation state are stripped. Span and timer bookkeeping is bounded so
//! misuse degrades into diagnostics instead of unbounded growth.
//!
//! # Architecture
//!
//! - [`ids`] - trace and span identifiers
//! - [`sanitize`] - turns arbitrary value graphs into transmit-safe data
//! - [`trace`] - span stack, timer registry and trace headers
//! - [`report`] - the [`Telemetry`] reporter, records and sinks
//! - [`config`] - layered configuration loading
//! - [`logging`] - `tracing` subscriber setup for local diagnostics
//! - [`error`] - error types and result aliases
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tracekit::{MemorySink, Telemetry, Value};
//!
//! let sink = Arc::new(MemorySink::new());
//! let telemetry = Telemetry::new(sink.clone());
//!
//! let _span = telemetry.span("login");
//! let meta = Value::map([("user", "ada"), ("password", "hunter2")]);
//! telemetry.report_warning("slow response", Some("auth"), Some(&meta));
//!
//! let record = &sink.records()[0];
//! assert_eq!(record.span_chain, vec!["login"]);
//! let meta = record.metadata.as_ref().unwrap();
//! assert_eq!(meta.get("password").and_then(|v| v.as_str()), Some("[Stripped]"));
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod logging;
pub mod report;
pub mod sanitize;
pub mod trace;

pub use error::{ConfigError, Result, SinkError};
pub use ids::{SpanId, TraceId};
pub use report::{
    EventKind, EventRecord, EventSink, LifecycleEvent, Level, MemorySink, ReportedError,
    SpanGuard, Telemetry,
};
pub use sanitize::{sanitize, SanitizedValue, Sanitizer, Value};
pub use trace::{TraceHeaders, TraceLimits};

/// tracekit version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        let telemetry = Telemetry::new(std::sync::Arc::new(report::NoopSink));
        let _headers: TraceHeaders = telemetry.trace_headers();
        let _clean: SanitizedValue = sanitize(&Value::from("ok"));
    }
}
