//! Unit tests for config file resolution and graceful degradation
//!
//! Tests that manipulate SCTRK_CONFIG or HOSTNAME are marked with #[serial]
//! so they run sequentially, not in parallel.

use sctrk_common::config::{
    load_toml_or_default, require_nonzero, resolve_config_path, station_location, LoggingConfig,
    CONFIG_ENV_VAR,
};
use sctrk_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    name: Option<String>,
}

#[test]
#[serial]
fn test_cli_argument_takes_precedence() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/sctrk-from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/sctrk-from-cli.toml")), CONFIG_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/sctrk-from-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/sctrk-from-env.toml");

    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/sctrk-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_var_ignored() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    let resolved = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_ne!(resolved, Some(PathBuf::from("   ")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_path_yields_defaults() {
    let config: SampleConfig = load_toml_or_default(None).unwrap();
    assert_eq!(config, SampleConfig::default());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_nonexistent_file_yields_defaults() {
    let path = PathBuf::from(format!("/tmp/sctrk-missing-{}.toml", std::process::id()));
    let config: SampleConfig = load_toml_or_default(Some(&path)).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_file_values_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
name = "dock-3"

[logging]
level = "debug"
file = "/var/log/sctrk.log"
"#
    )
    .unwrap();

    let config: SampleConfig = load_toml_or_default(Some(file.path())).unwrap();
    assert_eq!(config.name.as_deref(), Some("dock-3"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, Some(PathBuf::from("/var/log/sctrk.log")));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name = [unterminated").unwrap();

    let result: sctrk_common::Result<SampleConfig> = load_toml_or_default(Some(file.path()));
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn test_require_nonzero() {
    assert!(require_nonzero("skip_frames", 4).is_ok());
    let err = require_nonzero("skip_frames", 0).unwrap_err();
    assert!(err.to_string().contains("skip_frames"));
}

#[test]
#[serial]
fn test_station_location_uses_hostname() {
    let previous = env::var("HOSTNAME").ok();
    env::set_var("HOSTNAME", "dock-7");

    assert_eq!(station_location(), "Location_dock-7");

    match previous {
        Some(value) => env::set_var("HOSTNAME", value),
        None => env::remove_var("HOSTNAME"),
    }
}
