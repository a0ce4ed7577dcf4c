// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sink delivery: exactly-once hand-off, failure containment, backpressure.

use std::io::Write;
use std::sync::{Arc, Mutex};

use mockall::{mock, predicate::function, Sequence};
use tracekit::report::{
    ChannelSink, EventKind, EventRecord, EventSink, JsonLinesSink, MemorySink, Telemetry,
};
use tracekit::{Level, SinkError, Value};

mock! {
    pub Sink {}

    impl EventSink for Sink {
        fn send(&self, record: EventRecord) -> Result<(), SinkError>;
    }
}

#[test]
fn test_each_record_delivered_once_in_order() {
    let mut sink = MockSink::new();
    let mut seq = Sequence::new();
    sink.expect_send()
        .with(function(|r: &EventRecord| r.level == Level::Info && r.message == "first"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    sink.expect_send()
        .with(function(|r: &EventRecord| r.level == Level::Warning && r.message == "second"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let telemetry = Telemetry::new(Arc::new(sink));
    telemetry.report_info("first", None, None);
    telemetry.report_warning("second", None, None);
}

#[test]
fn test_sink_error_is_swallowed_and_counted() {
    let mut sink = MockSink::new();
    sink.expect_send()
        .times(2)
        .returning(|_| Err(SinkError::Transport("connection reset".to_string())));

    let telemetry = Telemetry::new(Arc::new(sink));
    telemetry.report_error("boom", None, None);
    telemetry.report_info("still running", None, None);

    let stats = telemetry.stats();
    assert_eq!(stats.sink_failures, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.infos, 1);
}

#[test]
fn test_sink_may_call_back_into_reporter() {
    let telemetry: Arc<Mutex<Option<Arc<Telemetry>>>> = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let handle = Arc::clone(&telemetry);
    let log = Arc::clone(&seen);
    let sink = move |record: EventRecord| -> Result<(), SinkError> {
        if let Some(t) = handle.lock().unwrap().as_ref() {
            log.lock().unwrap().push((record.message.clone(), t.span_chain()));
        }
        Ok(())
    };

    let reporter = Arc::new(Telemetry::new(Arc::new(sink)));
    *telemetry.lock().unwrap() = Some(Arc::clone(&reporter));

    reporter.start_span("reentrant");
    reporter.report_info("hello", None, None);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1, vec!["reentrant"]);

    telemetry.lock().unwrap().take();
}

#[test]
fn test_reported_error_is_classified() {
    let sink = Arc::new(MemorySink::new());
    let telemetry = Telemetry::new(sink.clone());

    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "avatar missing");
    telemetry.report_error(tracekit::report::ErrorInput::from_error(&io), Some("profile"), None);

    let api = Value::map([
        ("message", Value::from("Rate limited")),
        ("code", Value::from(429)),
        ("password", Value::from("p")),
    ]);
    telemetry.report_error(api, None, None);
    telemetry.report_error("plain text failure", None, None);

    let errors = sink.of_kind(EventKind::Error);
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0].message, "avatar missing");
    assert_eq!(errors[1].message, "Rate limited");
    assert_eq!(
        errors[1].error.as_ref().and_then(|e| e.code()).cloned(),
        Some(tracekit::SanitizedValue::Int(429))
    );
    let line = errors[1].to_json_line().unwrap();
    assert!(!line.contains("\"p\""));
    assert_eq!(errors[2].message, "plain text failure");
}

#[test]
fn test_channel_sink_drops_under_backpressure() {
    let (sink, mut rx) = ChannelSink::bounded(2);
    let telemetry = Telemetry::new(Arc::new(sink));

    for i in 0..5 {
        telemetry.report_info(&format!("event {}", i), None, None);
    }

    let stats = telemetry.stats();
    assert_eq!(stats.infos, 5);
    assert_eq!(stats.dropped, 3);

    assert_eq!(rx.try_recv().unwrap().message, "event 0");
    assert_eq!(rx.try_recv().unwrap().message, "event 1");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_channel_sink_closed_receiver() {
    let (sink, rx) = ChannelSink::bounded(4);
    drop(rx);
    let telemetry = Telemetry::new(Arc::new(sink));
    telemetry.report_info("nobody listening", None, None);

    let stats = telemetry.stats();
    assert_eq!(stats.sink_failures, 1);
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_json_lines_sink_writes_one_line_per_record() {
    let buf = SharedBuf::default();
    let telemetry = Telemetry::new(Arc::new(JsonLinesSink::new(buf.clone())));

    telemetry.start_span("sync");
    telemetry.report_info("started", Some("sync"), None);
    telemetry.report_warning("slow", None, None);

    let bytes = buf.0.lock().unwrap().clone();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["level"], "info");
    assert_eq!(first["kind"], "message");
    assert_eq!(first["spanChain"], serde_json::json!(["sync"]));
    assert_eq!(first["traceId"], telemetry.current_trace_id().to_string());
}
