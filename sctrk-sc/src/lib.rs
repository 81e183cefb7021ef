//! # SCTRK Scan Controller Library (sctrk-sc)
//!
//! Scan orchestration engine for a camera-based batch scanner.
//!
//! **Purpose:** Accumulate a batch of scanned identifiers whose size is
//! discovered from a ledger lookup, then record the batch's new location on
//! the ledger once every item has been scanned.
//!
//! **Architecture:** One guarded session store shared by a capture thread,
//! a decode worker, a fixed-tick evaluator and a trigger monitor. Ledger
//! calls run detached and post their results back through a channel.

pub mod api;
pub mod bridges;
pub mod config;
pub mod error;
pub mod scan;
pub mod session;

pub use error::{Error, Result};
pub use scan::{EngineBridges, ScanEngine};
