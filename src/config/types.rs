// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the structure of file-level and resolved configuration,
//! supporting JSON and YAML formats.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sanitize::{Redactor, Sanitizer, DEFAULT_MAX_DEPTH};
use crate::trace::{TraceLimits, DEFAULT_MAX_SPAN_DEPTH, DEFAULT_MAX_TIMERS, DEFAULT_TIMER_TTL};

/// Default interval of the background expiry sweep, in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1000;

/// Default capacity of a channel sink.
pub const DEFAULT_SINK_BUFFER: usize = 1024;

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

/// Configuration as written in a file.
/// Can be defined in .tracekit.json or .tracekit/config.json in the project root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracekitConfig {
    /// Maximum number of nested open spans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_span_depth: Option<usize>,

    /// Maximum number of concurrently running timers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_timers: Option<usize>,

    /// Time after which a running timer is auto-cleaned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_ttl_ms: Option<u64>,

    /// Interval of the background expiry sweep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_interval_ms: Option<u64>,

    /// Depth bound for metadata sanitization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitize_depth: Option<usize>,

    /// Extra keys to strip, on top of the built-in denylist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redact_keys: Option<Vec<String>>,

    /// Regexes over keys to strip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redact_patterns: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    /// Echo every record to the local console
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_echo: Option<bool>,

    /// Capacity of a channel sink
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_buffer: Option<usize>,
}

/// Fully resolved configuration, after merging every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub max_span_depth: usize,
    pub max_timers: usize,
    pub timer_ttl_ms: u64,
    pub sweep_interval_ms: u64,
    pub sanitize_depth: usize,
    pub redact_keys: Vec<String>,
    pub redact_patterns: Vec<String>,
    pub environment: Environment,
    /// Unset means "follow the environment".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_echo: Option<bool>,
    pub sink_buffer: usize,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            max_span_depth: DEFAULT_MAX_SPAN_DEPTH,
            max_timers: DEFAULT_MAX_TIMERS,
            timer_ttl_ms: DEFAULT_TIMER_TTL.as_millis() as u64,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            sanitize_depth: DEFAULT_MAX_DEPTH,
            redact_keys: Vec::new(),
            redact_patterns: Vec::new(),
            environment: Environment::default(),
            console_echo: None,
            sink_buffer: DEFAULT_SINK_BUFFER,
        }
    }
}

impl ResolvedConfig {
    pub fn trace_limits(&self) -> TraceLimits {
        TraceLimits {
            max_span_depth: self.max_span_depth,
            max_timers: self.max_timers,
            timer_ttl: self.timer_ttl(),
        }
    }

    pub fn timer_ttl(&self) -> Duration {
        Duration::from_millis(self.timer_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Build the metadata sanitizer. Fails on an invalid redact pattern.
    pub fn sanitizer(&self) -> Result<Sanitizer, ConfigError> {
        let redactor = Redactor::new()
            .with_keys(&self.redact_keys)
            .with_patterns(&self.redact_patterns)
            .map_err(|e| ConfigError::invalid("redactPatterns", e.to_string()))?;
        Ok(Sanitizer::new(self.sanitize_depth, redactor))
    }

    /// Whether records are echoed to the local console. Defaults to on in
    /// development.
    pub fn console_echo(&self) -> bool {
        self.console_echo
            .unwrap_or(self.environment == Environment::Development)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_span_depth == 0 {
            return Err(ConfigError::invalid("maxSpanDepth", "must be at least 1"));
        }
        if self.max_timers == 0 {
            return Err(ConfigError::invalid("maxTimers", "must be at least 1"));
        }
        if self.timer_ttl_ms == 0 {
            return Err(ConfigError::invalid("timerTtlMs", "must be greater than 0"));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::invalid("sweepIntervalMs", "must be greater than 0"));
        }
        if self.sink_buffer == 0 {
            return Err(ConfigError::invalid("sinkBuffer", "must be at least 1"));
        }
        self.sanitizer().map(|_| ())
    }
}
