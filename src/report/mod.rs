// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Reporting: the public call surface and everything downstream of it.
//!
//! - [`Telemetry`] - spans, timers and `report_*` for one session/request
//! - [`EventRecord`] - the finished, sanitized outbound unit
//! - [`EventSink`] - where records go (memory, JSON lines, channel, tracing)
//! - [`Stats`] - counters and timer latencies shared across forks
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tracekit::report::{MemorySink, Telemetry};
//! use tracekit::sanitize::Value;
//!
//! let sink = Arc::new(MemorySink::new());
//! let telemetry = Telemetry::new(sink.clone());
//!
//! telemetry.start_span("checkout");
//! telemetry.start_timer("payment");
//! telemetry.end_timer("payment", Some("checkout"), Some(&Value::map([("items", 3)])));
//! telemetry.report_error("card declined", Some("checkout"), None);
//! telemetry.end_span();
//!
//! assert_eq!(sink.len(), 2);
//! assert_eq!(sink.records()[1].span_chain, vec!["checkout"]);
//! ```

mod classify;
mod event;
mod lifecycle;
pub mod propagation;
mod reporter;
mod sink;
mod stats;
mod sweeper;

pub use classify::{classify, ErrorInput, ReportedError};
pub use event::{EventKind, EventRecord, Level};
pub use lifecycle::LifecycleEvent;
pub use reporter::{SpanGuard, Telemetry, TelemetryBuilder};
pub use sink::{ChannelSink, EventSink, JsonLinesSink, MemorySink, NoopSink, TracingSink};
pub use stats::{Histogram, Stats, StatsSnapshot, TimerStats, MAX_TRACKED_TIMERS, OTHER_TIMERS};
pub use sweeper::spawn_sweeper;
