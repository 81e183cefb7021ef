//! Session State Store
//!
//! Guarded container for the live session and the route. Every cross-thread
//! read or write goes through this type:
//! - `snapshot()` returns an immutable copy
//! - `reset()` replaces the session
//! - `record_decode()` is the decode worker's only write
//! - everything else is an evaluator transition applied under the lock
//!
//! Transitions return `Effect`s instead of performing side effects, so
//! nothing slow (ledger calls, tones) ever runs while the lock is held.

use super::transition::{CommitOutcome, Effect};
use super::{Route, Session, SessionId, SessionSnapshot};
use crate::bridges::BridgeError;
use crate::config::ScannerConfig;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Thresholds and timing used by session transitions
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPolicy {
    /// Decoded region must exceed this percentage of the frame area
    pub min_confidence_percent: f32,

    /// Minimum spacing between duplicate notices
    pub duplicate_notice_interval: Duration,

    /// Time since the last accepted item after which a duplicate resumes scanning
    pub auto_advance_after: Duration,

    /// Batch size applied when the lookup fails
    pub fallback_batch_size: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

impl SessionPolicy {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            min_confidence_percent: config.min_confidence_percent,
            duplicate_notice_interval: config.duplicate_notice_interval(),
            auto_advance_after: config.auto_advance_after(),
            fallback_batch_size: config.fallback_batch_size.max(1),
        }
    }
}

/// Outcome of `record_decode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeVerdict {
    /// Session moved to `ItemPendingAccept`
    Accepted,
    /// Session was not scanning
    NotScanning,
    /// Frame was captured in an earlier scanning window
    StaleFrame,
    /// Decoded region too small relative to the frame
    BelowThreshold,
    /// Decoder returned empty text
    EmptyValue,
}

/// Data guarded by the store lock
#[derive(Debug)]
pub(crate) struct StoreInner {
    pub(crate) session: Session,
    pub(crate) route: Route,
    next_epoch: u64,
}

impl StoreInner {
    pub(crate) fn new(destinations: Vec<String>) -> Self {
        Self {
            session: Session::idle(),
            route: Route::new(destinations),
            next_epoch: 1,
        }
    }

    /// Allocate a new scanning epoch
    pub(crate) fn bump_epoch(&mut self) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        epoch
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::capture(&self.session, &self.route)
    }
}

/// Session State Store
///
/// Uses a std Mutex: every critical section is short and never awaits.
#[derive(Debug)]
pub struct SessionStore {
    inner: Mutex<StoreInner>,
    policy: SessionPolicy,
}

impl SessionStore {
    /// Create a store holding an idle session
    pub fn new(destinations: Vec<String>, policy: SessionPolicy) -> Self {
        Self {
            inner: Mutex::new(StoreInner::new(destinations)),
            policy,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Acquire the lock, recovering from poisoning
    ///
    /// Transitions never leave the data half-written across a panic point,
    /// so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Immutable copy of the current session and route
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Epoch of the current scanning window, or None if not scanning
    pub fn scanning_epoch(&self) -> Option<u64> {
        let inner = self.lock();
        inner
            .session
            .phase
            .is_scanning()
            .then_some(inner.session.scan_epoch)
    }

    /// Replace the session with a fresh one that is already scanning
    pub fn reset(&self) -> Vec<Effect> {
        self.lock().reset()
    }

    /// Record a decode from the decode worker
    ///
    /// No-op unless the session is scanning in the same epoch the frame was
    /// captured in and the confidence clears the threshold.
    pub fn record_decode(&self, epoch: u64, value: &str, confidence: f32) -> (DecodeVerdict, SessionId) {
        let mut inner = self.lock();
        let verdict = inner.record_decode(epoch, value, confidence, &self.policy);
        (verdict, inner.session.id)
    }

    /// Apply an arbitrary evaluator transition atomically
    pub(crate) fn apply_evaluator_transition<R>(
        &self,
        transition: impl FnOnce(&mut StoreInner, &SessionPolicy) -> R,
    ) -> R {
        let mut inner = self.lock();
        transition(&mut inner, &self.policy)
    }

    /// One evaluator step at `now`
    pub fn evaluate(&self, now: Instant) -> Vec<Effect> {
        self.apply_evaluator_transition(|inner, policy| inner.step(now, policy))
    }

    /// Apply a batch size lookup result
    pub fn apply_batch_size(
        &self,
        session_id: SessionId,
        result: Result<usize, BridgeError>,
    ) -> Vec<Effect> {
        self.apply_evaluator_transition(|inner, policy| {
            inner.apply_batch_size(session_id, result, policy)
        })
    }

    /// Apply a location commit result
    pub fn apply_commit_outcome(
        &self,
        session_id: SessionId,
        destination: &str,
        outcome: CommitOutcome,
    ) -> Vec<Effect> {
        self.apply_evaluator_transition(|inner, _| {
            inner.apply_commit_outcome(session_id, destination, outcome)
        })
    }
}
