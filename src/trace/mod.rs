// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trace identity: the current trace id, the stack of open spans, and the
//! registry of running timers.
//!
//! The types here are plain state machines. They never emit records; the
//! reporter turns their outcomes into diagnostics.

mod clock;
mod context;
mod headers;
mod span_stack;
mod timers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{TraceContext, TraceReset};
pub use headers::{TraceHeaders, SPAN_ID_HEADER, TRACE_ID_HEADER};
pub use span_stack::{SpanEnd, SpanFrame, SpanStack, SpanStart, DEFAULT_MAX_SPAN_DEPTH};
pub use timers::{ExpiredTimer, TimerRegistry, TimerStart, DEFAULT_MAX_TIMERS, DEFAULT_TIMER_TTL};

use std::time::Duration;

/// Capacity limits for one trace context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLimits {
    pub max_span_depth: usize,
    pub max_timers: usize,
    pub timer_ttl: Duration,
}

impl Default for TraceLimits {
    fn default() -> Self {
        Self {
            max_span_depth: DEFAULT_MAX_SPAN_DEPTH,
            max_timers: DEFAULT_MAX_TIMERS,
            timer_ttl: DEFAULT_TIMER_TTL,
        }
    }
}
