//! # SCTRK Common Library
//!
//! Shared code for the SCTRK scan controller and its tooling:
//! - Error type
//! - Configuration file resolution and TOML loading
//! - Event types (ScanEvent enum) and the EventBus
//! - Ledger identifier normalization
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod identifier;
pub mod time;

pub use error::{Error, Result};
