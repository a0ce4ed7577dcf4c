// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for tracekit.
//!
//! Handles loading, merging, and validation of configuration from multiple sources:
//! - Global config: ~/.tracekit/config.json
//! - Workspace config: .tracekit.json, .tracekit/config.json, tracekit.config.json,
//!   or .tracekit.yaml
//! - Local config: .tracekit.local.json (gitignored, for personal overrides)
//! - CLI options: command-line arguments
//!
//! Configuration is merged with precedence (CLI > local > workspace > global > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{
    find_workspace_root, get_example_config, get_global_config_dir, get_global_config_path,
    init_config, load_config_file, load_global_config, load_global_config_from, load_local_config,
    load_workspace_config, save_workspace_config, CONFIG_FILES, GLOBAL_CONFIG_DIR,
    GLOBAL_CONFIG_FILE, LOCAL_CONFIG_FILE,
};

pub use merger::{default_config, merge_config, CliOptions};

pub use types::{
    Environment, ResolvedConfig, TracekitConfig, DEFAULT_SINK_BUFFER, DEFAULT_SWEEP_INTERVAL_MS,
};

use crate::error::ConfigError;
use std::path::Path;

/// Load, merge and validate all configuration sources for a workspace.
///
/// This is the main entry point for configuration loading.
pub fn load_config(
    workspace_root: &Path,
    cli_options: CliOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let global = load_global_config()?;
    resolve(global, workspace_root, cli_options)
}

/// Like [`load_config`], reading global config from `global_dir` instead of
/// the home directory.
pub fn load_config_with_global_dir(
    workspace_root: &Path,
    global_dir: &Path,
    cli_options: CliOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let global = load_global_config_from(global_dir)?;
    resolve(global, workspace_root, cli_options)
}

fn resolve(
    global: Option<TracekitConfig>,
    workspace_root: &Path,
    cli_options: CliOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let workspace = load_workspace_config(workspace_root)?;
    let local = load_local_config(workspace_root)?;

    let config = merge_config(global, workspace, local, cli_options);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_with_no_files() {
        let workspace = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        let config =
            load_config_with_global_dir(workspace.path(), global.path(), CliOptions::default())
                .unwrap();
        assert_eq!(config, ResolvedConfig::default());
    }

    #[test]
    fn test_load_config_layers() {
        let workspace = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        std::fs::write(
            global.path().join(GLOBAL_CONFIG_FILE),
            r#"{"maxTimers": 5, "redactKeys": ["ssn"]}"#,
        )
        .unwrap();
        std::fs::write(
            workspace.path().join(".tracekit.json"),
            r#"{"maxTimers": 7, "timerTtlMs": 1000}"#,
        )
        .unwrap();
        std::fs::write(
            workspace.path().join(LOCAL_CONFIG_FILE),
            r#"{"timerTtlMs": 2000}"#,
        )
        .unwrap();

        let cli = CliOptions {
            sanitize_depth: Some(3),
            ..Default::default()
        };
        let config = load_config_with_global_dir(workspace.path(), global.path(), cli).unwrap();

        assert_eq!(config.max_timers, 7);
        assert_eq!(config.timer_ttl_ms, 2000);
        assert_eq!(config.sanitize_depth, 3);
        assert_eq!(config.redact_keys, vec!["ssn"]);
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let workspace = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        std::fs::write(workspace.path().join(".tracekit.json"), r#"{"maxSpanDepth": 0}"#).unwrap();

        let result =
            load_config_with_global_dir(workspace.path(), global.path(), CliOptions::default());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
