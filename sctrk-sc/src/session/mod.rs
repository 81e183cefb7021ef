//! Scan session state
//!
//! A `Session` is the single live record of scan progress. It is replaced
//! wholesale on every reset and is only ever touched through
//! [`SessionStore`], which hands out immutable snapshots and applies
//! transitions atomically.
//!
//! The `Route` (destination sequence, location index, arrived flag) lives
//! next to the session inside the store and survives resets.

pub mod store;
mod transition;

pub use store::{DecodeVerdict, SessionPolicy, SessionStore};
pub use transition::{CommitOutcome, Effect, Signal};

use sctrk_common::events::ScanPhase;
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

/// Session identifier (regenerated on every reset)
pub type SessionId = Uuid;

/// Live scan session
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,

    /// Current state machine phase
    pub phase: ScanPhase,

    /// Expected batch size (None until the first item's lookup resolves)
    pub expected_count: Option<usize>,

    /// Accepted identifiers in scan order (no duplicates)
    pub scanned_items: Vec<String>,

    /// When the most recent item was accepted
    pub last_accepted_at: Option<Instant>,

    /// When the most recent duplicate notice was issued
    pub last_duplicate_notice_at: Option<Instant>,

    /// Most recent confident decode not yet reconciled by the evaluator
    pub pending_value: Option<String>,

    /// Batch size lookup in flight
    pub lookup_in_flight: bool,

    /// Location commit in flight
    pub commit_in_flight: bool,

    /// Epoch of the current scanning window
    ///
    /// Bumped on every entry into `Scanning`; frames and decodes stamped with
    /// an older epoch are discarded.
    pub scan_epoch: u64,
}

impl Session {
    /// Session before the first reset
    pub(crate) fn idle() -> Self {
        Self {
            id: Uuid::nil(),
            phase: ScanPhase::Idle,
            expected_count: None,
            scanned_items: Vec::new(),
            last_accepted_at: None,
            last_duplicate_notice_at: None,
            pending_value: None,
            lookup_in_flight: false,
            commit_in_flight: false,
            scan_epoch: 0,
        }
    }

    /// Fresh session, already scanning
    pub(crate) fn started(id: SessionId, scan_epoch: u64) -> Self {
        Self {
            id,
            phase: ScanPhase::Scanning,
            scan_epoch,
            ..Self::idle()
        }
    }

    /// Number of accepted items
    pub fn current_index(&self) -> usize {
        self.scanned_items.len()
    }

    /// A ledger lookup or commit is in flight
    pub fn batch_processing(&self) -> bool {
        self.lookup_in_flight || self.commit_in_flight
    }

    /// Exact-match membership test (no normalization)
    pub fn contains(&self, value: &str) -> bool {
        self.scanned_items.iter().any(|item| item == value)
    }
}

/// Destination sequence shared by every session
#[derive(Debug, Clone)]
pub struct Route {
    destinations: Vec<String>,
    location_index: usize,
    arrived: bool,
}

impl Route {
    /// Create a route; an empty list is replaced by a single placeholder
    pub fn new(destinations: Vec<String>) -> Self {
        let destinations = if destinations.is_empty() {
            vec!["Unknown_Location".to_string()]
        } else {
            destinations
        };

        Self {
            destinations,
            location_index: 0,
            arrived: false,
        }
    }

    /// Destination for the next completed batch
    pub fn current_destination(&self) -> &str {
        &self.destinations[self.location_index]
    }

    pub fn location_index(&self) -> usize {
        self.location_index
    }

    /// Every destination has been visited
    pub fn arrived(&self) -> bool {
        self.arrived
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// Move to the next destination
    ///
    /// Returns true when the index wrapped to 0, which marks the route as
    /// arrived for the rest of the process lifetime.
    pub(crate) fn advance(&mut self) -> bool {
        self.location_index = (self.location_index + 1) % self.destinations.len();
        if self.location_index == 0 {
            self.arrived = true;
            return true;
        }
        false
    }
}

/// Read-only view of the store handed to presenters and the HTTP API
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub phase: ScanPhase,
    pub current_index: usize,
    pub expected_count: Option<usize>,
    pub scanned_items: Vec<String>,
    pub pending_value: Option<String>,
    pub batch_processing: bool,
    pub location_index: usize,
    pub destination: String,
    pub arrived: bool,
    #[serde(skip)]
    pub scan_epoch: u64,
}

impl SessionSnapshot {
    pub(crate) fn capture(session: &Session, route: &Route) -> Self {
        Self {
            session_id: session.id,
            phase: session.phase,
            current_index: session.current_index(),
            expected_count: session.expected_count,
            scanned_items: session.scanned_items.clone(),
            pending_value: session.pending_value.clone(),
            batch_processing: session.batch_processing(),
            location_index: route.location_index(),
            destination: route.current_destination().to_string(),
            arrived: route.arrived(),
            scan_epoch: session.scan_epoch,
        }
    }
}
