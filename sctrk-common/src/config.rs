//! Configuration file resolution and loading
//!
//! Config file lookup follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`~/.config/sctrk/config.toml` on Linux)
//! 4. System config file (`/etc/sctrk/config.toml`, Linux only)
//!
//! A missing file is never fatal: callers receive built-in defaults and a
//! warning is logged.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SCTRK_CONFIG";

/// Directory name used under the platform config directory
const APP_DIR: &str = "sctrk";

/// Config file name
const CONFIG_FILE: &str = "config.toml";

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the config file path
///
/// Returns `None` when no explicit path was given and no config file exists
/// at the well-known locations.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3/4: well-known locations
    default_config_locations().into_iter().find(|p| p.exists())
}

/// Platform-dependent config file candidates, highest priority first
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join(CONFIG_FILE));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE));
    }

    candidates
}

/// Load a TOML config file, falling back to defaults
///
/// - `None` path: defaults, with a warning
/// - Path that does not exist: defaults, with a warning
/// - Unreadable file: `Error::Io`
/// - Malformed TOML or wrong field types: `Error::Parse`
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No config file found, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str::<T>(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(parsed)
}

/// Name of this station, derived from the host name
///
/// Uses `HOSTNAME`, then `/etc/hostname`. Returns `None` if neither yields a
/// non-empty value.
pub fn host_name() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        let name = name.trim().to_string();
        if !name.is_empty() {
            return Some(name);
        }
    }

    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Location label for this station (`Location_<hostname>`)
pub fn station_location() -> String {
    match host_name() {
        Some(name) => format!("Location_{}", name),
        None => "Unknown_Location".to_string(),
    }
}

/// Ensure a value is strictly positive, naming the offending field
pub fn require_nonzero(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(Error::Config(format!("{} must be greater than zero", field)));
    }
    Ok(())
}
