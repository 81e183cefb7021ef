//! Configuration for the sctrk-sc scan controller
//!
//! All settings come from one TOML file (see `sctrk_common::config` for how
//! the file is located). Every field has a built-in default, so an empty or
//! missing file yields a working controller.
//!
//! ```toml
//! [server]
//! port = 5750
//!
//! [scanner]
//! skip_frames = 4
//! min_confidence_percent = 5.0
//!
//! [route]
//! destinations = ["Dock_A", "Final_Destination"]
//!
//! [ledger]
//! gateway_url = "http://127.0.0.1:8545/ledger"
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use sctrk_common::config::{load_toml_or_default, require_nonzero, station_location, LoggingConfig};
use std::path::Path;
use std::time::Duration;

/// Complete controller configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ControllerConfig {
    /// HTTP control surface
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Scan engine timing and thresholds
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Trigger (button) debounce timing
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Destination sequence for completed batches
    #[serde(default)]
    pub route: RouteConfig,

    /// Ledger gateway
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Camera frame geometry (simulation mode)
    #[serde(default)]
    pub camera: CameraConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

/// Scan engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Enqueue every Nth captured frame
    #[serde(default = "default_skip_frames")]
    pub skip_frames: u32,

    /// Frame queue capacity (producer drops when full)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Decoded region must exceed this percentage of the frame area
    #[serde(default = "default_min_confidence_percent")]
    pub min_confidence_percent: f32,

    /// Scan evaluator tick
    #[serde(default = "default_evaluator_tick_ms")]
    pub evaluator_tick_ms: u64,

    /// Minimum spacing between duplicate notices
    #[serde(default = "default_duplicate_notice_interval_ms")]
    pub duplicate_notice_interval_ms: u64,

    /// Time since the last accepted item after which a duplicate resumes scanning
    #[serde(default = "default_auto_advance_after_ms")]
    pub auto_advance_after_ms: u64,

    /// Batch size used when the ledger lookup fails
    #[serde(default = "default_fallback_batch_size")]
    pub fallback_batch_size: usize,

    /// Delay before retrying after the camera returned no frame
    #[serde(default = "default_empty_frame_retry_ms")]
    pub empty_frame_retry_ms: u64,

    /// Decode worker poll interval while not scanning
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Maximum time to wait for each activity on shutdown
    #[serde(default = "default_shutdown_join_timeout_ms")]
    pub shutdown_join_timeout_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            skip_frames: default_skip_frames(),
            queue_capacity: default_queue_capacity(),
            min_confidence_percent: default_min_confidence_percent(),
            evaluator_tick_ms: default_evaluator_tick_ms(),
            duplicate_notice_interval_ms: default_duplicate_notice_interval_ms(),
            auto_advance_after_ms: default_auto_advance_after_ms(),
            fallback_batch_size: default_fallback_batch_size(),
            empty_frame_retry_ms: default_empty_frame_retry_ms(),
            idle_poll_ms: default_idle_poll_ms(),
            shutdown_join_timeout_ms: default_shutdown_join_timeout_ms(),
        }
    }
}

impl ScannerConfig {
    pub fn evaluator_tick(&self) -> Duration {
        Duration::from_millis(self.evaluator_tick_ms)
    }

    pub fn duplicate_notice_interval(&self) -> Duration {
        Duration::from_millis(self.duplicate_notice_interval_ms)
    }

    pub fn auto_advance_after(&self) -> Duration {
        Duration::from_millis(self.auto_advance_after_ms)
    }

    pub fn empty_frame_retry(&self) -> Duration {
        Duration::from_millis(self.empty_frame_retry_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    pub fn shutdown_join_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_join_timeout_ms)
    }
}

/// Trigger monitor settings
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// Poll interval while waiting for a press
    #[serde(default = "default_trigger_poll_ms")]
    pub poll_interval_ms: u64,

    /// Poll interval while waiting for release
    #[serde(default = "default_release_poll_ms")]
    pub release_poll_ms: u64,

    /// Settle delay after release before re-arming
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_trigger_poll_ms(),
            release_poll_ms: default_release_poll_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

/// Destination sequence
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Destinations visited in order, one per completed batch
    #[serde(default = "default_destinations")]
    pub destinations: Vec<String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            destinations: default_destinations(),
        }
    }
}

/// Ledger gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Gateway base URL; the in-memory ledger is used when unset
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// Upper bound for each detached ledger operation
    #[serde(default = "default_ledger_timeout_ms")]
    pub timeout_ms: u64,

    /// Batch size reported by the in-memory ledger
    #[serde(default = "default_sim_batch_size")]
    pub sim_batch_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            timeout_ms: default_ledger_timeout_ms(),
            sim_batch_size: default_sim_batch_size(),
        }
    }
}

impl LedgerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Simulated camera geometry
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_frame_side")]
    pub width: u32,

    #[serde(default = "default_frame_side")]
    pub height: u32,

    /// Capture interval of the simulated camera
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: default_frame_side(),
            height: default_frame_side(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

fn default_port() -> u16 {
    5750
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_skip_frames() -> u32 {
    4
}

/// Frames in flight between capture and decode never exceed this
pub const MAX_QUEUE_CAPACITY: usize = 2;

fn default_queue_capacity() -> usize {
    MAX_QUEUE_CAPACITY
}

fn default_min_confidence_percent() -> f32 {
    5.0
}

fn default_evaluator_tick_ms() -> u64 {
    100
}

fn default_duplicate_notice_interval_ms() -> u64 {
    1000
}

fn default_auto_advance_after_ms() -> u64 {
    2000
}

fn default_fallback_batch_size() -> usize {
    2
}

fn default_empty_frame_retry_ms() -> u64 {
    100
}

fn default_idle_poll_ms() -> u64 {
    5
}

fn default_shutdown_join_timeout_ms() -> u64 {
    1000
}

fn default_trigger_poll_ms() -> u64 {
    50
}

fn default_release_poll_ms() -> u64 {
    10
}

fn default_settle_ms() -> u64 {
    200
}

fn default_destinations() -> Vec<String> {
    vec![station_location(), "Final_Destination".to_string()]
}

fn default_ledger_timeout_ms() -> u64 {
    120_000
}

fn default_sim_batch_size() -> usize {
    2
}

fn default_frame_side() -> u32 {
    720
}

fn default_frame_interval_ms() -> u64 {
    33
}

impl ControllerConfig {
    /// Load configuration from an optional file path and validate it
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: ControllerConfig = load_toml_or_default(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        require_nonzero("scanner.skip_frames", self.scanner.skip_frames as u64)?;
        require_nonzero("scanner.queue_capacity", self.scanner.queue_capacity as u64)?;
        if self.scanner.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(Error::Config(format!(
                "scanner.queue_capacity must be at most {}, got {}",
                MAX_QUEUE_CAPACITY, self.scanner.queue_capacity
            )));
        }
        require_nonzero("scanner.evaluator_tick_ms", self.scanner.evaluator_tick_ms)?;
        require_nonzero(
            "scanner.fallback_batch_size",
            self.scanner.fallback_batch_size as u64,
        )?;
        require_nonzero("ledger.timeout_ms", self.ledger.timeout_ms)?;

        if !(0.0..100.0).contains(&self.scanner.min_confidence_percent) {
            return Err(Error::Config(format!(
                "scanner.min_confidence_percent must be within [0, 100), got {}",
                self.scanner.min_confidence_percent
            )));
        }

        if self.route.destinations.is_empty() {
            return Err(Error::Config(
                "route.destinations must name at least one destination".to_string(),
            ));
        }

        Ok(())
    }
}
