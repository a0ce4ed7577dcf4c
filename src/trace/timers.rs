// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Named performance timers with capacity eviction and TTL expiry.
//!
//! Each entry carries a deadline instead of its own OS timer. Expired entries
//! are collected by [`TimerRegistry::sweep`]; removing an entry is what
//! cancels its expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default maximum number of live timers.
pub const DEFAULT_MAX_TIMERS: usize = 100;

/// Default time a timer may stay open before it is auto-cleaned.
pub const DEFAULT_TIMER_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct TimerEntry {
    started_at: Instant,
    deadline: Instant,
    /// Insertion order; eviction is by insertion, not by access.
    seq: u64,
}

/// Outcome of starting a timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerStart {
    /// Oldest timer dropped to make room.
    pub evicted: Option<String>,
    /// A timer with the same name was already running and was restarted.
    pub restarted: bool,
}

/// A timer removed by the sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredTimer {
    pub name: String,
    pub age: Duration,
}

/// Bounded map of running timers.
#[derive(Debug)]
pub struct TimerRegistry {
    entries: HashMap<String, TimerEntry>,
    max_timers: usize,
    ttl: Duration,
    next_seq: u64,
}

impl TimerRegistry {
    pub fn new(max_timers: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_timers: max_timers.max(1),
            ttl,
            next_seq: 0,
        }
    }

    pub fn start(&mut self, name: &str, now: Instant) -> TimerStart {
        let mut outcome = TimerStart::default();

        if self.entries.remove(name).is_some() {
            outcome.restarted = true;
        } else if self.entries.len() >= self.max_timers {
            outcome.evicted = self.evict_oldest();
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            name.to_string(),
            TimerEntry {
                started_at: now,
                deadline: now + self.ttl,
                seq,
            },
        );
        outcome
    }

    /// Stop a timer, returning its elapsed time. Unknown names give `None`.
    pub fn end(&mut self, name: &str, now: Instant) -> Option<Duration> {
        self.entries
            .remove(name)
            .map(|entry| now.saturating_duration_since(entry.started_at))
    }

    /// Remove every timer whose deadline has passed, oldest deadline first.
    pub fn sweep(&mut self, now: Instant) -> Vec<ExpiredTimer> {
        let mut due: Vec<(Instant, String)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(name, entry)| (entry.deadline, name.clone()))
            .collect();
        due.sort();

        due.into_iter()
            .filter_map(|(_, name)| {
                self.entries.remove(&name).map(|entry| ExpiredTimer {
                    age: now.saturating_duration_since(entry.started_at),
                    name,
                })
            })
            .collect()
    }

    /// Cancel every pending timer. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|entry| entry.deadline).min()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_timers(&self) -> usize {
        self.max_timers
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(name, _)| name.clone())?;
        self.entries.remove(&oldest);
        Some(oldest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_start_and_end() {
        let now = Instant::now();
        let mut timers = TimerRegistry::new(4, TTL);
        timers.start("load", now);

        let elapsed = timers.end("load", now + Duration::from_millis(40));
        assert_eq!(elapsed, Some(Duration::from_millis(40)));
        assert!(timers.is_empty());
        assert_eq!(timers.end("load", now), None);
    }

    #[test]
    fn test_evicts_oldest_by_insertion() {
        let now = Instant::now();
        let mut timers = TimerRegistry::new(2, TTL);
        timers.start("first", now);
        timers.start("second", now);

        let outcome = timers.start("third", now);
        assert_eq!(outcome.evicted.as_deref(), Some("first"));
        assert_eq!(timers.len(), 2);
        assert!(!timers.contains("first"));
    }

    #[test]
    fn test_restart_does_not_evict() {
        let now = Instant::now();
        let mut timers = TimerRegistry::new(2, TTL);
        timers.start("a", now);
        timers.start("b", now);

        let outcome = timers.start("a", now + Duration::from_secs(1));
        assert!(outcome.restarted);
        assert!(outcome.evicted.is_none());

        // "a" is now newest, so "b" goes next.
        let outcome = timers.start("c", now);
        assert_eq!(outcome.evicted.as_deref(), Some("b"));
    }

    #[test]
    fn test_sweep_removes_expired_only() {
        let now = Instant::now();
        let mut timers = TimerRegistry::new(4, TTL);
        timers.start("old", now);
        timers.start("new", now + Duration::from_secs(30));

        assert!(timers.sweep(now + Duration::from_secs(59)).is_empty());

        let expired = timers.sweep(now + TTL);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].name, "old");
        assert_eq!(expired[0].age, TTL);
        assert!(timers.contains("new"));

        // Already swept, nothing fires twice.
        assert!(timers.sweep(now + TTL).is_empty());
    }

    #[test]
    fn test_clear_cancels_everything() {
        let now = Instant::now();
        let mut timers = TimerRegistry::new(4, TTL);
        timers.start("a", now);
        timers.start("b", now);

        assert_eq!(timers.clear(), 2);
        assert!(timers.sweep(now + TTL * 2).is_empty());
        assert!(timers.next_deadline().is_none());
    }
}
