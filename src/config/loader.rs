// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.
//!
//! Handles loading configuration from JSON and YAML files in various locations.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::{Environment, TracekitConfig};

/// Config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[
    ".tracekit.json",
    ".tracekit/config.json",
    "tracekit.config.json",
    ".tracekit.yaml",
    ".tracekit.yml",
];

/// Local config file name (for per-directory overrides).
pub const LOCAL_CONFIG_FILE: &str = ".tracekit.local.json";

/// Global config directory name.
pub const GLOBAL_CONFIG_DIR: &str = ".tracekit";

/// Global config file name.
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Get the global config directory path.
pub fn get_global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

/// Get the global config file path.
pub fn get_global_config_path() -> Option<PathBuf> {
    get_global_config_dir().map(|dir| dir.join(GLOBAL_CONFIG_FILE))
}

/// Load global configuration from ~/.tracekit/config.json.
pub fn load_global_config() -> Result<Option<TracekitConfig>, ConfigError> {
    match get_global_config_dir() {
        Some(dir) => load_global_config_from(&dir),
        None => Ok(None),
    }
}

/// Load global configuration from an explicit directory.
pub fn load_global_config_from(dir: &Path) -> Result<Option<TracekitConfig>, ConfigError> {
    let path = dir.join(GLOBAL_CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Load workspace configuration from the workspace root.
///
/// The first file of [`CONFIG_FILES`] that exists wins.
pub fn load_workspace_config(workspace_root: &Path) -> Result<Option<TracekitConfig>, ConfigError> {
    for filename in CONFIG_FILES {
        let path = workspace_root.join(filename);
        if path.exists() {
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load local configuration from .tracekit.local.json.
pub fn load_local_config(workspace_root: &Path) -> Result<Option<TracekitConfig>, ConfigError> {
    let path = workspace_root.join(LOCAL_CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Load a configuration file (JSON or YAML).
pub fn load_config_file(path: &Path) -> Result<TracekitConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        _ => serde_json::from_str(&content).map_err(ConfigError::from),
    }
}

/// Save workspace configuration to a file.
pub fn save_workspace_config(
    workspace_root: &Path,
    config: &TracekitConfig,
    filename: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    let filename = filename.unwrap_or(".tracekit.json");
    let path = workspace_root.join(filename);

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;

    Ok(path)
}

/// Initialize a new config file with the example or provided configuration.
pub fn init_config(
    workspace_root: &Path,
    config: Option<TracekitConfig>,
) -> Result<PathBuf, ConfigError> {
    let config = config.unwrap_or_else(get_example_config);
    save_workspace_config(workspace_root, &config, None)
}

/// Find the workspace root by searching for config files.
///
/// Walks up the directory tree from `start` until it finds a directory
/// containing a config file or reaches the filesystem root.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| CONFIG_FILES.iter().any(|f| dir.join(f).exists()))
        .map(Path::to_path_buf)
}

/// Get an example configuration.
pub fn get_example_config() -> TracekitConfig {
    TracekitConfig {
        max_span_depth: Some(32),
        max_timers: Some(100),
        timer_ttl_ms: Some(60_000),
        sanitize_depth: Some(5),
        redact_keys: Some(vec!["ssn".to_string(), "card_number".to_string()]),
        redact_patterns: Some(vec!["^x-internal-".to_string()]),
        environment: Some(Environment::Development),
        ..Default::default()
    }
}
