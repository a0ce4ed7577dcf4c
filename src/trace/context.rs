// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-session trace state.

use std::time::{Duration, Instant};

use crate::ids::{SpanId, TraceId};

use super::span_stack::{SpanEnd, SpanFrame, SpanStack, SpanStart};
use super::timers::{ExpiredTimer, TimerRegistry, TimerStart};
use super::TraceLimits;

/// What a trace reset discarded.
#[derive(Debug, Clone)]
pub struct TraceReset {
    pub previous: TraceId,
    pub trace_id: TraceId,
    /// Spans still open at reset, oldest first.
    pub unclosed: Vec<SpanFrame>,
    /// Timers cancelled by the reset.
    pub cancelled_timers: usize,
}

/// The current trace id together with the span stack and timer registry it
/// owns. One instance per session or per request; nothing else holds the
/// stack or the registry.
#[derive(Debug)]
pub struct TraceContext {
    trace_id: TraceId,
    spans: SpanStack,
    timers: TimerRegistry,
}

impl TraceContext {
    pub fn new(limits: &TraceLimits) -> Self {
        Self {
            trace_id: TraceId::new(),
            spans: SpanStack::new(limits.max_span_depth),
            timers: TimerRegistry::new(limits.max_timers, limits.timer_ttl),
        }
    }

    pub fn start_span(&mut self, name: &str, now: Instant) -> SpanStart {
        self.spans.push(name, now)
    }

    pub fn end_span(&mut self) -> SpanEnd {
        self.spans.pop()
    }

    /// Rotate to a fresh trace, dropping spans and cancelling timers.
    pub fn reset(&mut self) -> TraceReset {
        self.rotate_to(TraceId::new())
    }

    /// Continue a trace started elsewhere, e.g. from an inbound request.
    pub fn adopt(&mut self, trace_id: TraceId) -> TraceReset {
        self.rotate_to(trace_id)
    }

    fn rotate_to(&mut self, trace_id: TraceId) -> TraceReset {
        let previous = std::mem::replace(&mut self.trace_id, trace_id);
        TraceReset {
            previous,
            trace_id,
            unclosed: self.spans.clear(),
            cancelled_timers: self.timers.clear(),
        }
    }

    pub fn start_timer(&mut self, name: &str, now: Instant) -> TimerStart {
        self.timers.start(name, now)
    }

    pub fn end_timer(&mut self, name: &str, now: Instant) -> Option<Duration> {
        self.timers.end(name, now)
    }

    pub fn sweep_timers(&mut self, now: Instant) -> Vec<ExpiredTimer> {
        self.timers.sweep(now)
    }

    pub fn clear_timers(&mut self) -> usize {
        self.timers.clear()
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn current_span(&self) -> Option<SpanId> {
        self.spans.current()
    }

    pub fn span_chain(&self) -> Vec<String> {
        self.spans.chain()
    }

    pub fn span_depth(&self) -> usize {
        self.spans.depth()
    }

    pub fn max_span_depth(&self) -> usize {
        self.spans.max_depth()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn has_timer(&self, name: &str) -> bool {
        self.timers.contains(name)
    }

    pub fn timer_ttl(&self) -> Duration {
        self.timers.ttl()
    }

    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }
}
