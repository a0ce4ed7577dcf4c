// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use super::types::{Environment, ResolvedConfig, TracekitConfig};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub max_span_depth: Option<usize>,
    pub max_timers: Option<usize>,
    pub timer_ttl_ms: Option<u64>,
    pub sanitize_depth: Option<usize>,
    pub redact_keys: Vec<String>,
    pub environment: Option<Environment>,
    pub console_echo: Option<bool>,
}

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge multiple configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. Local config (.tracekit.local.json)
/// 3. Workspace config (.tracekit.json)
/// 4. Global config (~/.tracekit/config.json)
/// 5. Default values
///
/// Scalars are overridden; redact key and pattern lists accumulate.
pub fn merge_config(
    global: Option<TracekitConfig>,
    workspace: Option<TracekitConfig>,
    local: Option<TracekitConfig>,
    cli: CliOptions,
) -> ResolvedConfig {
    let mut result = default_config();

    for config in [global, workspace, local].iter().flatten() {
        apply_file_config(&mut result, config);
    }

    apply_cli_options(&mut result, &cli);

    result
}

fn apply_file_config(result: &mut ResolvedConfig, config: &TracekitConfig) {
    if let Some(depth) = config.max_span_depth {
        result.max_span_depth = depth;
    }

    if let Some(max) = config.max_timers {
        result.max_timers = max;
    }

    if let Some(ttl) = config.timer_ttl_ms {
        result.timer_ttl_ms = ttl;
    }

    if let Some(interval) = config.sweep_interval_ms {
        result.sweep_interval_ms = interval;
    }

    if let Some(depth) = config.sanitize_depth {
        result.sanitize_depth = depth;
    }

    if let Some(ref keys) = config.redact_keys {
        extend_unique(&mut result.redact_keys, keys);
    }

    if let Some(ref patterns) = config.redact_patterns {
        extend_unique(&mut result.redact_patterns, patterns);
    }

    if let Some(env) = config.environment {
        result.environment = env;
    }

    if config.console_echo.is_some() {
        result.console_echo = config.console_echo;
    }

    if let Some(buffer) = config.sink_buffer {
        result.sink_buffer = buffer;
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if let Some(depth) = cli.max_span_depth {
        result.max_span_depth = depth;
    }

    if let Some(max) = cli.max_timers {
        result.max_timers = max;
    }

    if let Some(ttl) = cli.timer_ttl_ms {
        result.timer_ttl_ms = ttl;
    }

    if let Some(depth) = cli.sanitize_depth {
        result.sanitize_depth = depth;
    }

    extend_unique(&mut result.redact_keys, &cli.redact_keys);

    if let Some(env) = cli.environment {
        result.environment = env;
    }

    if cli.console_echo.is_some() {
        result.console_echo = cli.console_echo;
    }
}

fn extend_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
