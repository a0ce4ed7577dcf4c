// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Host lifecycle hooks.

use crate::ids::TraceId;

use super::reporter::Telemetry;

/// Session boundaries reported by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// App returned to the foreground or a new session began.
    Foreground,
    /// App moved to the background.
    Background,
    /// Process is shutting down.
    Terminate,
    SignIn,
    SignOut,
}

impl Telemetry {
    /// React to a lifecycle event. Returns the new trace id when the event
    /// rotated the trace.
    pub fn on_lifecycle(&self, event: LifecycleEvent) -> Option<TraceId> {
        match event {
            LifecycleEvent::Foreground => {
                self.on_foreground();
                None
            }
            LifecycleEvent::Background | LifecycleEvent::Terminate => Some(self.on_background()),
            LifecycleEvent::SignIn | LifecycleEvent::SignOut => Some(self.reset_trace()),
        }
    }

    /// The app entered the background or is terminating: report open spans
    /// as a leak, then reset the trace and cancel every timer.
    pub fn on_background(&self) -> TraceId {
        let reset = self.rotate(|ctx| ctx.reset(), true);
        if !reset.unclosed.is_empty() {
            tracing::warn!(
                trace_id = %reset.previous,
                unclosed = reset.unclosed.len(),
                "Unclosed spans at background"
            );
        }
        reset.trace_id
    }

    /// The app returned to the foreground. Trace state is left untouched.
    pub fn on_foreground(&self) {
        tracing::debug!(trace_id = %self.current_trace_id(), "foreground");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::event::EventKind;
    use crate::report::sink::MemorySink;
    use std::sync::Arc;

    #[test]
    fn test_background_reports_leaked_spans() {
        let sink = Arc::new(MemorySink::new());
        let telemetry = Telemetry::new(sink.clone());
        let before = telemetry.current_trace_id();
        telemetry.start_span("booking");
        telemetry.start_span("payment");
        telemetry.start_timer("upload");

        let after = telemetry.on_background();

        assert_ne!(before, after);
        assert!(telemetry.span_chain().is_empty());
        assert_eq!(telemetry.timer_count(), 0);

        let leaks = sink.matching("2 unclosed spans detected on background");
        assert_eq!(leaks.len(), 1);
        assert_eq!(leaks[0].trace_id, before);
        assert_eq!(leaks[0].span_chain, vec!["booking", "payment"]);
        assert_eq!(leaks[0].kind, EventKind::Diagnostic);
    }

    #[test]
    fn test_background_without_spans_is_quiet() {
        let sink = Arc::new(MemorySink::new());
        let telemetry = Telemetry::new(sink.clone());
        telemetry.on_lifecycle(LifecycleEvent::Terminate);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_foreground_keeps_trace() {
        let sink = Arc::new(MemorySink::new());
        let telemetry = Telemetry::new(sink.clone());
        let before = telemetry.current_trace_id();
        assert!(telemetry.on_lifecycle(LifecycleEvent::Foreground).is_none());
        assert_eq!(telemetry.current_trace_id(), before);
    }

    #[test]
    fn test_sign_out_rotates_without_leak_report() {
        let sink = Arc::new(MemorySink::new());
        let telemetry = Telemetry::new(sink.clone());
        telemetry.start_span("profile");
        let before = telemetry.current_trace_id();

        let after = telemetry.on_lifecycle(LifecycleEvent::SignOut).unwrap();
        assert_ne!(after, before);
        assert!(sink.is_empty());
    }
}
