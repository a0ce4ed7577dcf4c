// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Reporter statistics.
//!
//! Counts what the reporter emitted and what it lost, plus a latency
//! histogram per timer name. One instance is shared by a reporter and all of
//! its forks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::error::SinkError;

use super::event::{EventKind, EventRecord, Level};

/// Distinct timer names tracked before new names fold into [`OTHER_TIMERS`].
pub const MAX_TRACKED_TIMERS: usize = 256;

/// Bucket for completed timers whose name arrived after the cap was reached.
pub const OTHER_TIMERS: &str = "<other>";

/// Shared counters for one reporter family.
#[derive(Debug)]
pub struct Stats {
    errors: AtomicU64,
    warnings: AtomicU64,
    infos: AtomicU64,
    diagnostics: AtomicU64,
    sink_failures: AtomicU64,
    dropped: AtomicU64,
    span_overflows: AtomicU64,
    timers_expired: AtomicU64,
    timers_evicted: AtomicU64,
    timers: RwLock<HashMap<String, TimerStats>>,
    max_tracked_timers: usize,
    start_time: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self::with_timer_capacity(MAX_TRACKED_TIMERS)
    }

    /// Track at most `max_tracked_timers` distinct names, plus the
    /// [`OTHER_TIMERS`] bucket.
    pub fn with_timer_capacity(max_tracked_timers: usize) -> Self {
        Self {
            errors: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
            infos: AtomicU64::new(0),
            diagnostics: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            span_overflows: AtomicU64::new(0),
            timers_expired: AtomicU64::new(0),
            timers_evicted: AtomicU64::new(0),
            timers: RwLock::new(HashMap::new()),
            max_tracked_timers,
            start_time: Instant::now(),
        }
    }

    /// Count a record as it is handed to the sink.
    pub fn record_event(&self, record: &EventRecord) {
        let counter = match record.level {
            Level::Error => &self.errors,
            Level::Warning => &self.warnings,
            Level::Info => &self.infos,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if record.kind == EventKind::Diagnostic {
            self.diagnostics.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a sink failure; backpressure also counts as a drop.
    pub fn record_sink_failure(&self, err: &SinkError) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
        if err.is_backpressure() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_span_overflow(&self) {
        self.span_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timer_expired(&self) {
        self.timers_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timer_evicted(&self) {
        self.timers_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed timer.
    pub fn record_timer(&self, name: &str, duration: Duration) {
        let mut timers = self.timers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(stats) = timers.get_mut(name) {
            stats.record(duration);
            return;
        }
        let tracked = timers.len() - usize::from(timers.contains_key(OTHER_TIMERS));
        let key = if tracked < self.max_tracked_timers {
            name
        } else {
            OTHER_TIMERS
        };
        timers
            .entry(key.to_string())
            .or_insert_with(TimerStats::new)
            .record(duration);
    }

    /// Latency stats for one timer name.
    pub fn timer(&self, name: &str) -> Option<TimerStats> {
        self.timers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            infos: self.infos.load(Ordering::Relaxed),
            diagnostics: self.diagnostics.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            span_overflows: self.span_overflows.load(Ordering::Relaxed),
            timers_expired: self.timers_expired.load(Ordering::Relaxed),
            timers_evicted: self.timers_evicted.load(Ordering::Relaxed),
            timers: self
                .timers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            uptime: self.start_time.elapsed(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Completed-timer latencies for one name.
#[derive(Debug, Clone)]
pub struct TimerStats {
    pub count: u64,
    pub total_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub histogram: Histogram,
}

impl TimerStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            histogram: Histogram::default(),
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.min_duration = self.min_duration.min(duration);
        self.max_duration = self.max_duration.max(duration);
        self.histogram.record(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.count as u32
        }
    }
}

impl Default for TimerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-bucket latency histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Upper bucket bounds in milliseconds; one overflow bucket follows.
    bounds_ms: Vec<u64>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn with_bounds(bounds_ms: Vec<u64>) -> Self {
        let counts = vec![0; bounds_ms.len() + 1];
        Self { bounds_ms, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        let idx = self
            .bounds_ms
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(self.bounds_ms.len());
        self.counts[idx] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Upper bound of the bucket holding the `p`th percentile.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = ((total as f64 * p / 100.0).ceil() as u64).max(1);
        let mut cumulative = 0u64;
        for (idx, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                let ms = match self.bounds_ms.get(idx) {
                    Some(&bound) => bound,
                    // Overflow bucket: report an order of magnitude above the last bound.
                    None => self.bounds_ms.last().copied().unwrap_or(0) * 10,
                };
                return Duration::from_millis(ms);
            }
        }
        Duration::ZERO
    }

    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    pub fn p90(&self) -> Duration {
        self.percentile(90.0)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // UI-scale latencies: 10ms up to one minute (the default timer TTL).
        Self::with_bounds(vec![10, 50, 100, 250, 500, 1_000, 5_000, 15_000, 60_000])
    }
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub errors: u64,
    pub warnings: u64,
    pub infos: u64,
    pub diagnostics: u64,
    pub sink_failures: u64,
    pub dropped: u64,
    pub span_overflows: u64,
    pub timers_expired: u64,
    pub timers_evicted: u64,
    pub timers: HashMap<String, TimerStats>,
    pub uptime: Duration,
}

impl StatsSnapshot {
    /// Total records handed to the sink.
    pub fn total_events(&self) -> u64 {
        self.errors + self.warnings + self.infos
    }

    /// Human-readable summary.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Telemetry Report ===\n\n");
        report.push_str(&format!("Uptime: {:.2?}\n", self.uptime));
        report.push_str(&format!(
            "Events: {} ({} error, {} warning, {} info), {} diagnostic\n",
            self.total_events(),
            self.errors,
            self.warnings,
            self.infos,
            self.diagnostics
        ));
        report.push_str(&format!(
            "Sink: {} failures, {} dropped\n",
            self.sink_failures, self.dropped
        ));
        report.push_str(&format!(
            "Guards: {} span overflows, {} timers expired, {} timers evicted\n",
            self.span_overflows, self.timers_expired, self.timers_evicted
        ));

        if !self.timers.is_empty() {
            report.push_str("\nTimers:\n");
            let mut names: Vec<_> = self.timers.keys().collect();
            names.sort();
            for name in names {
                let stats = &self.timers[name];
                report.push_str(&format!(
                    "  {}: {} runs, avg {:.2?}, p99 <= {:.2?}\n",
                    name,
                    stats.count,
                    stats.avg_duration(),
                    stats.histogram.p99()
                ));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TraceId;

    fn record(level: Level, kind: EventKind) -> EventRecord {
        EventRecord {
            level,
            kind,
            message: String::new(),
            context: None,
            trace_id: TraceId::new(),
            span_id: None,
            span_chain: Vec::new(),
            metadata: None,
            error: None,
            duration_ms: None,
            timestamp_millis: 0,
        }
    }

    #[test]
    fn test_event_counters() {
        let stats = Stats::new();
        stats.record_event(&record(Level::Error, EventKind::Error));
        stats.record_event(&record(Level::Warning, EventKind::Diagnostic));
        stats.record_event(&record(Level::Info, EventKind::Performance));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_events(), 3);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.diagnostics, 1);
    }

    #[test]
    fn test_sink_failures_and_drops() {
        let stats = Stats::new();
        stats.record_sink_failure(&SinkError::Full);
        stats.record_sink_failure(&SinkError::Closed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sink_failures, 2);
        assert_eq!(snapshot.dropped, 1);
    }

    #[test]
    fn test_timer_stats() {
        let stats = Stats::new();
        stats.record_timer("load", Duration::from_millis(10));
        stats.record_timer("load", Duration::from_millis(30));

        let load = stats.timer("load").unwrap();
        assert_eq!(load.count, 2);
        assert_eq!(load.avg_duration(), Duration::from_millis(20));
        assert_eq!(load.min_duration, Duration::from_millis(10));
        assert!(stats.timer("missing").is_none());
    }

    #[test]
    fn test_timer_names_are_capped() {
        let stats = Stats::with_timer_capacity(3);
        for i in 0..50 {
            stats.record_timer(&format!("fetch:{}", i), Duration::from_millis(5));
        }
        stats.record_timer("fetch:1", Duration::from_millis(15));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.timers.len(), 4);
        assert_eq!(snapshot.timers[OTHER_TIMERS].count, 47);
        assert_eq!(snapshot.timers["fetch:1"].count, 2);
        assert!(stats.timer("fetch:10").is_none());
    }

    #[test]
    fn test_histogram_percentiles() {
        let mut hist = Histogram::default();
        for _ in 0..100 {
            hist.record(Duration::from_millis(30));
        }
        assert_eq!(hist.counts()[1], 100);
        assert_eq!(hist.p50(), Duration::from_millis(50));
        assert_eq!(hist.p99(), Duration::from_millis(50));

        hist.record(Duration::from_secs(120));
        assert_eq!(hist.percentile(100.0), Duration::from_millis(600_000));
    }

    #[test]
    fn test_format_report() {
        let stats = Stats::new();
        stats.record_event(&record(Level::Info, EventKind::Performance));
        stats.record_timer("checkout", Duration::from_millis(120));

        let report = stats.snapshot().format_report();
        assert!(report.contains("Events: 1"));
        assert!(report.contains("checkout: 1 runs"));
    }
}
