//! Configuration loading utilities.
//!
//! Settings are read from environment variables or from a YAML/JSON file.
//! Files are looked up in the working directory first, then in the user's
//! configuration directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use utils::config::{get_env_parse, load_config_file};
//!
//! let timeout = get_env_parse::<u64>("LLMKIT_TIMEOUT_SECS")?;
//! let settings: LlmSettings = load_config_file("llmkit.yaml")?;
//! ```

use crate::error::{Result, UtilsError};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Get an environment variable as a string.
pub fn get_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|e| {
        UtilsError::ConfigError(format!("Environment variable '{}' not found: {}", key, e))
    })
}

/// Get an environment variable, treating an empty or blank value as unset.
pub fn get_env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable and parse it to the specified type.
pub fn get_env_parse<T: std::str::FromStr>(key: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let value = get_env(key)?;
    value.trim().parse::<T>().map_err(|e| {
        UtilsError::ConfigError(format!(
            "Failed to parse environment variable '{}': {}",
            key, e
        ))
    })
}

/// Load configuration from a YAML file.
pub fn load_yaml_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())?;
    serde_yaml::from_str(&content).map_err(|e| {
        UtilsError::ConfigError(format!(
            "Failed to parse YAML config from {:?}: {}",
            path.as_ref(),
            e
        ))
    })
}

/// Load configuration from a JSON file.
pub fn load_json_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&content).map_err(|e| {
        UtilsError::ConfigError(format!(
            "Failed to parse JSON config from {:?}: {}",
            path.as_ref(),
            e
        ))
    })
}

/// Load configuration from a file (auto-detect format from extension).
pub fn load_config_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            UtilsError::ConfigError(format!("Unable to determine file extension for {:?}", path))
        })?;

    debug!(path = %path.display(), "loading config file");
    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => load_yaml_config(path),
        "json" => load_json_config(path),
        _ => Err(UtilsError::ConfigError(format!(
            "Unsupported config file extension: {}",
            extension
        ))),
    }
}

/// Directories searched by [`find_config_file`], in priority order.
pub fn config_search_dirs(app: &str) -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(config_dir) = dirs::config_dir() {
        dirs.push(config_dir.join(app));
    }
    dirs
}

/// Find `<app>.yaml`, `<app>.yml` or `<app>.json` in the working directory or
/// the user's configuration directory.
pub fn find_config_file(app: &str) -> Option<PathBuf> {
    find_config_file_in(app, &config_search_dirs(app))
}

fn find_config_file_in(app: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            CONFIG_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", app, ext)))
        })
        .find(|candidate| candidate.is_file())
}
