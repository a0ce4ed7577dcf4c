// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The public telemetry surface.
//!
//! [`Telemetry`] owns one [`TraceContext`] and turns calls into records for
//! the injected sink. Nothing here returns an error or panics out to the
//! caller: misuse resolves to a safe default plus, where useful, a
//! diagnostic record.
//!
//! Metadata is sanitized before the context lock is taken and records are
//! delivered after it is released, so a sink or a [`Sanitize`] impl may call
//! back into the same reporter.
//!
//! [`Sanitize`]: crate::sanitize::Sanitize

use std::error::Error as StdError;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::config::ResolvedConfig;
use crate::error::{ConfigError, SinkError};
use crate::ids::{SpanId, TraceId};
use crate::sanitize::{SanitizedValue, Sanitizer, Value};
use crate::trace::{
    Clock, SpanEnd, SpanStart, SystemClock, TraceContext, TraceHeaders, TraceLimits, TraceReset,
};

use super::classify::{classify, ErrorInput, ReportedError};
use super::event::{EventKind, EventRecord, Level};
use super::sink::EventSink;
use super::stats::{Stats, StatsSnapshot};

/// State shared by a reporter and its forks.
struct Shared {
    sink: Arc<dyn EventSink>,
    sanitizer: Sanitizer,
    clock: Arc<dyn Clock>,
    stats: Stats,
    limits: TraceLimits,
    console_echo: bool,
}

/// Builder for [`Telemetry`].
pub struct TelemetryBuilder {
    sink: Arc<dyn EventSink>,
    sanitizer: Sanitizer,
    clock: Arc<dyn Clock>,
    limits: TraceLimits,
    console_echo: bool,
}

impl TelemetryBuilder {
    fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            sanitizer: Sanitizer::default(),
            clock: Arc::new(SystemClock),
            limits: TraceLimits::default(),
            console_echo: false,
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_limits(mut self, limits: TraceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Echo every record to the local `tracing` console.
    pub fn with_console_echo(mut self, echo: bool) -> Self {
        self.console_echo = echo;
        self
    }

    pub fn build(self) -> Telemetry {
        let context = TraceContext::new(&self.limits);
        Telemetry {
            context: Mutex::new(context),
            shared: Arc::new(Shared {
                sink: self.sink,
                sanitizer: self.sanitizer,
                clock: self.clock,
                stats: Stats::new(),
                limits: self.limits,
                console_echo: self.console_echo,
            }),
        }
    }
}

/// A record under construction.
struct Draft {
    level: Level,
    kind: EventKind,
    message: String,
    context: Option<String>,
    metadata: Option<SanitizedValue>,
    error: Option<ReportedError>,
    duration_ms: Option<f64>,
}

impl Draft {
    fn new(level: Level, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            message: message.into(),
            context: None,
            metadata: None,
            error: None,
            duration_ms: None,
        }
    }

    fn diagnostic(message: impl Into<String>, context: &str) -> Self {
        Self::new(Level::Warning, EventKind::Diagnostic, message).context(Some(context))
    }

    fn context(mut self, context: Option<&str>) -> Self {
        self.context = context.map(str::to_string);
        self
    }

    fn metadata(mut self, metadata: Option<SanitizedValue>) -> Self {
        self.metadata = metadata;
        self
    }

    fn fields(self, fields: Vec<(&str, SanitizedValue)>) -> Self {
        let map = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.metadata(Some(SanitizedValue::Map(map)))
    }
}

/// Telemetry reporter for one session or request.
pub struct Telemetry {
    context: Mutex<TraceContext>,
    shared: Arc<Shared>,
}

impl Telemetry {
    /// A reporter with default limits and the system clock.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::builder(sink).build()
    }

    pub fn builder(sink: Arc<dyn EventSink>) -> TelemetryBuilder {
        TelemetryBuilder::new(sink)
    }

    /// A reporter configured from resolved configuration.
    pub fn from_config(config: &ResolvedConfig, sink: Arc<dyn EventSink>) -> Result<Self, ConfigError> {
        Ok(Self::builder(sink)
            .with_sanitizer(config.sanitizer()?)
            .with_limits(config.trace_limits())
            .with_console_echo(config.console_echo())
            .build())
    }

    /// A reporter with a fresh, independent trace context that shares this
    /// one's sink, configuration and stats. Use one per inbound request.
    pub fn fork(&self) -> Self {
        Self {
            context: Mutex::new(TraceContext::new(&self.shared.limits)),
            shared: Arc::clone(&self.shared),
        }
    }

    // ------------------------------------------------------------------
    // Spans
    // ------------------------------------------------------------------

    /// Open a span. At capacity the overflow sentinel is returned and
    /// nothing is pushed.
    pub fn start_span(&self, name: &str) -> SpanId {
        let now = self.shared.clock.now();
        let mut pending = Vec::new();
        let start = {
            let mut ctx = self.lock();
            self.collect_expired(&mut ctx, now, &mut pending);
            let start = ctx.start_span(name, now);
            if let SpanStart::Overflow { first: true } = start {
                let draft = Draft::diagnostic("Span stack overflow prevented", "span_stack").fields(vec![
                    ("attemptedSpan", SanitizedValue::from(name)),
                    ("maxDepth", SanitizedValue::Int(ctx.max_span_depth() as i64)),
                ]);
                pending.push(self.build(&ctx, draft));
            }
            start
        };

        match start {
            SpanStart::Opened(id) => tracing::trace!(span = name, span_id = %id, "span opened"),
            SpanStart::Overflow { .. } => {
                self.shared.stats.record_span_overflow();
                tracing::debug!(span = name, "span refused, stack full");
            }
        }
        self.dispatch(pending);
        start.id()
    }

    /// Close the innermost span. With nothing open this is a no-op.
    pub fn end_span(&self) {
        let now = self.shared.clock.now();
        let mut pending = Vec::new();
        let end = {
            let mut ctx = self.lock();
            self.collect_expired(&mut ctx, now, &mut pending);
            ctx.end_span()
        };

        match end {
            SpanEnd::Closed(frame) => tracing::trace!(
                span = %frame.name,
                elapsed_ms = now.saturating_duration_since(frame.started_at).as_millis() as u64,
                "span closed"
            ),
            SpanEnd::Overflow => tracing::trace!("overflowed span closed"),
            SpanEnd::Empty => tracing::debug!("end_span called with no open span"),
        }
        self.dispatch(pending);
    }

    /// Open a span that closes when the guard drops.
    pub fn span(&self, name: &str) -> SpanGuard<'_> {
        let id = self.start_span(name);
        SpanGuard {
            telemetry: self,
            id,
        }
    }

    /// Run `f` inside a span. An `Err` is reported while the span is still
    /// current and then returned unchanged.
    pub fn with_trace<T, E, F>(&self, name: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: StdError + 'static,
    {
        let _span = self.span(name);
        let result = f();
        if let Err(err) = &result {
            self.report_error(ErrorInput::from_error(err), Some(name), None);
        }
        result
    }

    /// Async counterpart of [`Telemetry::with_trace`].
    pub async fn with_trace_async<T, E, Fut>(&self, name: &str, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: StdError + 'static,
    {
        let _span = self.span(name);
        let result = fut.await;
        if let Err(err) = &result {
            self.report_error(ErrorInput::from_error(err), Some(name), None);
        }
        result
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Start (or restart) a named timer.
    pub fn start_timer(&self, name: &str) {
        let now = self.shared.clock.now();
        let mut pending = Vec::new();
        {
            let mut ctx = self.lock();
            self.collect_expired(&mut ctx, now, &mut pending);
            let outcome = ctx.start_timer(name, now);
            if let Some(evicted) = outcome.evicted {
                self.shared.stats.record_timer_evicted();
                let draft = Draft::diagnostic(format!("Timer evicted at capacity: {}", evicted), "timer_registry")
                    .fields(vec![
                        ("timer", SanitizedValue::String(evicted)),
                        ("maxTimers", SanitizedValue::Int(self.shared.limits.max_timers as i64)),
                    ]);
                pending.push(self.build(&ctx, draft));
            }
            if outcome.restarted {
                tracing::debug!(timer = name, "timer restarted");
            }
        }
        self.dispatch(pending);
    }

    /// Stop a timer and emit its duration. Unknown names are a no-op.
    pub fn end_timer(&self, name: &str, context: Option<&str>, metadata: Option<&Value>) {
        let metadata = metadata.map(|m| self.shared.sanitizer.sanitize(m));
        let now = self.shared.clock.now();
        let mut pending = Vec::new();
        {
            let mut ctx = self.lock();
            self.collect_expired(&mut ctx, now, &mut pending);
            match ctx.end_timer(name, now) {
                Some(elapsed) => {
                    self.shared.stats.record_timer(name, elapsed);
                    let mut draft = Draft::new(
                        Level::Info,
                        EventKind::Performance,
                        format!("Timer: {} took {}ms", name, elapsed.as_millis()),
                    )
                    .context(context)
                    .metadata(metadata);
                    draft.duration_ms = Some(elapsed.as_secs_f64() * 1000.0);
                    pending.push(self.build(&ctx, draft));
                }
                None => tracing::debug!(timer = name, "end_timer for unknown timer"),
            }
        }
        self.dispatch(pending);
    }

    /// Cancel every running timer without emitting anything.
    pub fn clear_all_timers(&self) {
        let cleared = self.lock().clear_timers();
        tracing::debug!(cleared, "timers cleared");
    }

    /// Auto-clean timers past their TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.shared.clock.now();
        let mut pending = Vec::new();
        {
            let mut ctx = self.lock();
            self.collect_expired(&mut ctx, now, &mut pending);
        }
        let count = pending.len();
        self.dispatch(pending);
        count
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Report an error. The error is borrowed and never altered.
    pub fn report_error<'a>(
        &self,
        error: impl Into<ErrorInput<'a>>,
        context: Option<&str>,
        metadata: Option<&Value>,
    ) {
        let reported = classify(error.into(), &self.shared.sanitizer);
        let metadata = metadata.map(|m| self.shared.sanitizer.sanitize(m));
        let mut draft = Draft::new(Level::Error, EventKind::Error, reported.message())
            .context(context)
            .metadata(metadata);
        draft.error = Some(reported);
        self.emit(draft);
    }

    pub fn report_warning(&self, message: &str, context: Option<&str>, metadata: Option<&Value>) {
        self.report_message(Level::Warning, message, context, metadata);
    }

    pub fn report_info(&self, message: &str, context: Option<&str>, metadata: Option<&Value>) {
        self.report_message(Level::Info, message, context, metadata);
    }

    fn report_message(&self, level: Level, message: &str, context: Option<&str>, metadata: Option<&Value>) {
        let metadata = metadata.map(|m| self.shared.sanitizer.sanitize(m));
        self.emit(
            Draft::new(level, EventKind::Message, message)
                .context(context)
                .metadata(metadata),
        );
    }

    // ------------------------------------------------------------------
    // Trace identity
    // ------------------------------------------------------------------

    /// Rotate to a new trace id, dropping open spans and cancelling timers.
    pub fn reset_trace(&self) -> TraceId {
        self.rotate(|ctx| ctx.reset(), false).trace_id
    }

    /// Continue a trace started by a remote caller.
    pub fn continue_trace(&self, headers: &TraceHeaders) {
        self.rotate(|ctx| ctx.adopt(headers.trace_id), false);
    }

    /// Reset the trace. When `report_leaks` is set, open spans are reported
    /// against the outgoing trace before it is discarded.
    pub(crate) fn rotate<F>(&self, rotate: F, report_leaks: bool) -> TraceReset
    where
        F: FnOnce(&mut TraceContext) -> TraceReset,
    {
        let now = self.shared.clock.now();
        let mut pending = Vec::new();
        let reset = {
            let mut ctx = self.lock();
            self.collect_expired(&mut ctx, now, &mut pending);
            let depth = ctx.span_depth();
            if report_leaks && depth > 0 {
                let open = ctx
                    .span_chain()
                    .into_iter()
                    .map(SanitizedValue::String)
                    .collect();
                let draft = Draft::diagnostic(
                    format!("{} unclosed spans detected on background", depth),
                    "lifecycle",
                )
                .fields(vec![
                    ("unclosedSpans", SanitizedValue::Array(open)),
                    ("runningTimers", SanitizedValue::Int(ctx.timer_count() as i64)),
                ]);
                pending.push(self.build(&ctx, draft));
            }
            rotate(&mut *ctx)
        };

        tracing::debug!(
            previous = %reset.previous,
            trace_id = %reset.trace_id,
            unclosed = reset.unclosed.len(),
            cancelled_timers = reset.cancelled_timers,
            "trace rotated"
        );
        self.dispatch(pending);
        reset
    }

    pub fn current_trace_id(&self) -> TraceId {
        self.lock().trace_id()
    }

    pub fn current_span_id(&self) -> Option<SpanId> {
        self.lock().current_span()
    }

    /// Open span names, oldest first.
    pub fn span_chain(&self) -> Vec<String> {
        self.lock().span_chain()
    }

    pub fn span_depth(&self) -> usize {
        self.lock().span_depth()
    }

    pub fn timer_count(&self) -> usize {
        self.lock().timer_count()
    }

    pub fn has_timer(&self, name: &str) -> bool {
        self.lock().has_timer(name)
    }

    /// Correlation headers for an outbound request.
    pub fn trace_headers(&self) -> TraceHeaders {
        let ctx = self.lock();
        TraceHeaders {
            trace_id: ctx.trace_id(),
            span_id: ctx.current_span(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn limits(&self) -> TraceLimits {
        self.shared.limits
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, TraceContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, draft: Draft) {
        let now = self.shared.clock.now();
        let mut pending = Vec::new();
        {
            let mut ctx = self.lock();
            self.collect_expired(&mut ctx, now, &mut pending);
            pending.push(self.build(&ctx, draft));
        }
        self.dispatch(pending);
    }

    fn collect_expired(&self, ctx: &mut TraceContext, now: Instant, pending: &mut Vec<EventRecord>) {
        let ttl_ms = ctx.timer_ttl().as_millis() as i64;
        for expired in ctx.sweep_timers(now) {
            self.shared.stats.record_timer_expired();
            let draft = Draft::diagnostic(format!("Timer auto-cleaned: {}", expired.name), "orphaned_timer")
                .fields(vec![
                    ("timer", SanitizedValue::from(expired.name.as_str())),
                    ("ageMs", SanitizedValue::Int(expired.age.as_millis() as i64)),
                    ("ttlMs", SanitizedValue::Int(ttl_ms)),
                ]);
            pending.push(self.build(ctx, draft));
        }
    }

    fn build(&self, ctx: &TraceContext, draft: Draft) -> EventRecord {
        EventRecord {
            level: draft.level,
            kind: draft.kind,
            message: draft.message,
            context: draft.context,
            trace_id: ctx.trace_id(),
            span_id: ctx.current_span(),
            span_chain: ctx.span_chain(),
            metadata: draft.metadata,
            error: draft.error,
            duration_ms: draft.duration_ms,
            timestamp_millis: self.shared.clock.wall_millis(),
        }
    }

    fn dispatch(&self, records: Vec<EventRecord>) {
        for record in records {
            self.deliver(record);
        }
    }

    fn deliver(&self, record: EventRecord) {
        let shared = &self.shared;
        shared.stats.record_event(&record);
        if shared.console_echo {
            tracing::debug!(
                target: "tracekit::console",
                trace_id = %record.trace_id,
                level = %record.level,
                kind = %record.kind,
                "{}",
                record.message
            );
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.sink.send(record)));
        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => SinkError::Panicked(panic_message(payload.as_ref())),
        };

        shared.stats.record_sink_failure(&err);
        if err.is_backpressure() {
            tracing::debug!("Telemetry record dropped: {}", err);
        } else {
            tracing::warn!("Telemetry sink failed: {}", err);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Closes its span on drop, including during unwinding.
pub struct SpanGuard<'a> {
    telemetry: &'a Telemetry,
    id: SpanId,
}

impl SpanGuard<'_> {
    pub fn id(&self) -> SpanId {
        self.id
    }
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        self.telemetry.end_span();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::sink::MemorySink;
    use crate::trace::ManualClock;
    use std::time::Duration;

    fn telemetry() -> (Telemetry, Arc<MemorySink>, Arc<ManualClock>) {
        let sink = Arc::new(MemorySink::new());
        let clock = Arc::new(ManualClock::new());
        let telemetry = Telemetry::builder(sink.clone())
            .with_clock(clock.clone())
            .with_limits(TraceLimits {
                max_span_depth: 3,
                max_timers: 2,
                timer_ttl: Duration::from_secs(60),
            })
            .build();
        (telemetry, sink, clock)
    }

    #[test]
    fn test_report_stamps_trace_and_spans() {
        let (telemetry, sink, _) = telemetry();
        let span = telemetry.start_span("checkout");
        telemetry.report_info("payment sheet opened", Some("checkout"), None);

        let records = sink.take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].trace_id, telemetry.current_trace_id());
        assert_eq!(records[0].span_id, Some(span));
        assert_eq!(records[0].span_chain, vec!["checkout"]);
        assert_eq!(records[0].context.as_deref(), Some("checkout"));
        assert_eq!(records[0].level, Level::Info);
    }

    #[test]
    fn test_overflow_emits_one_diagnostic() {
        let (telemetry, sink, _) = telemetry();
        for i in 0..5 {
            telemetry.start_span(&format!("s{}", i));
        }
        assert_eq!(telemetry.span_depth(), 3);
        assert_eq!(sink.matching("Span stack overflow prevented").len(), 1);
        assert_eq!(telemetry.stats().span_overflows, 2);
    }

    #[test]
    fn test_timer_eviction_diagnostic() {
        let (telemetry, sink, _) = telemetry();
        telemetry.start_timer("a");
        telemetry.start_timer("b");
        telemetry.start_timer("c");

        assert!(!telemetry.has_timer("a"));
        assert_eq!(telemetry.timer_count(), 2);
        let evicted = sink.matching("Timer evicted at capacity: a");
        assert_eq!(evicted.len(), 1);
        assert!(evicted[0].is_diagnostic());
    }

    #[test]
    fn test_expired_timer_fires_before_end() {
        let (telemetry, sink, clock) = telemetry();
        telemetry.start_timer("upload");
        clock.advance(Duration::from_secs(61));

        telemetry.end_timer("upload", None, None);
        assert_eq!(sink.matching("Timer auto-cleaned: upload").len(), 1);
        assert!(sink.of_kind(EventKind::Performance).is_empty());
    }

    #[test]
    fn test_sink_panic_is_contained() {
        let sink = Arc::new(|_record: EventRecord| -> Result<(), SinkError> { panic!("transport exploded") });
        let telemetry = Telemetry::new(sink);
        telemetry.report_warning("still fine", None, None);

        let stats = telemetry.stats();
        assert_eq!(stats.sink_failures, 1);
        assert_eq!(stats.warnings, 1);
    }

    #[test]
    fn test_span_guard_closes_on_drop() {
        let (telemetry, _, _) = telemetry();
        {
            let guard = telemetry.span("screen");
            assert_eq!(telemetry.current_span_id(), Some(guard.id()));
        }
        assert!(telemetry.span_chain().is_empty());
    }

    #[test]
    fn test_fork_is_independent_but_shares_stats() {
        let (telemetry, sink, _) = telemetry();
        let request = telemetry.fork();
        telemetry.start_span("session");
        request.start_span("request");

        assert_ne!(telemetry.current_trace_id(), request.current_trace_id());
        assert_eq!(request.span_chain(), vec!["request"]);

        request.report_info("handled", None, None);
        assert_eq!(sink.len(), 1);
        assert_eq!(telemetry.stats().infos, 1);
    }
}
