// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sinks: where finished records go.
//!
//! The real backend transport lives outside this crate. A sink should not
//! block; [`ChannelSink`] hands records to a bounded queue and drops them
//! when the consumer falls behind.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::SinkError;

use super::event::{EventKind, EventRecord, Level};

/// Receives finished records.
pub trait EventSink: Send + Sync {
    /// Accept one record. Errors are caught and counted by the reporter.
    fn send(&self, record: EventRecord) -> Result<(), SinkError>;
}

impl<F> EventSink for F
where
    F: Fn(EventRecord) -> Result<(), SinkError> + Send + Sync,
{
    fn send(&self, record: EventRecord) -> Result<(), SinkError> {
        self(record)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn send(&self, _record: EventRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record received so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.lock().clone()
    }

    /// Remove and return every record received so far.
    pub fn take(&self) -> Vec<EventRecord> {
        std::mem::take(&mut *self.lock())
    }

    /// Records of one kind.
    pub fn of_kind(&self, kind: EventKind) -> Vec<EventRecord> {
        self.lock()
            .iter()
            .filter(|record| record.kind == kind)
            .cloned()
            .collect()
    }

    /// Records whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<EventRecord> {
        self.lock()
            .iter()
            .filter(|record| record.message.contains(needle))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EventRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for MemorySink {
    fn send(&self, record: EventRecord) -> Result<(), SinkError> {
        self.lock().push(record);
        Ok(())
    }
}

/// Writes each record as one line of JSON.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn send(&self, record: EventRecord) -> Result<(), SinkError> {
        let line = record.to_json_line()?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Forwards records to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn send(&self, record: EventRecord) -> Result<(), SinkError> {
        let trace_id = record.trace_id.to_string();
        let span_id = record.span_id.map(|id| id.to_string()).unwrap_or_default();
        match record.level {
            Level::Error => tracing::error!(
                target: "tracekit::events",
                trace_id = %trace_id,
                span_id = %span_id,
                kind = %record.kind,
                "{}",
                record.message
            ),
            Level::Warning => tracing::warn!(
                target: "tracekit::events",
                trace_id = %trace_id,
                span_id = %span_id,
                kind = %record.kind,
                "{}",
                record.message
            ),
            Level::Info => tracing::info!(
                target: "tracekit::events",
                trace_id = %trace_id,
                span_id = %span_id,
                kind = %record.kind,
                "{}",
                record.message
            ),
        }
        Ok(())
    }
}

/// Hands records to a bounded queue drained by an async consumer.
///
/// When the queue is full the record is dropped and [`SinkError::Full`] is
/// returned; the reporter counts it as backpressure.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<EventRecord>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<EventRecord>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Free slots in the queue.
    pub fn remaining(&self) -> usize {
        self.sender.capacity()
    }
}

impl EventSink for ChannelSink {
    fn send(&self, record: EventRecord) -> Result<(), SinkError> {
        self.sender.try_send(record).map_err(|err| match err {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
