//! Evaluator state machine
//!
//! Every transition runs under the store lock and completes in one call.
//! Transitions never perform I/O; they return `Effect`s that the evaluator
//! executes after the lock is released.
//!
//! ```text
//! Idle ──reset──▶ Scanning ──decode──▶ ItemPendingAccept
//!                    ▲                   │ first item ──▶ AwaitingBatchSize ──result──▶ BatchSizeKnown
//!                    │                   │ next item  ──▶ Scanning                            │
//!                    │                   │ last item  ──▶ Complete                            │
//!                    │                   │ duplicate  ──▶ (throttled notice, auto-advance)    │
//!                    └───────────────────┴────────────────────────────────────────────────────┘
//! ```

use super::store::{DecodeVerdict, SessionPolicy, StoreInner};
use super::{Session, SessionId};
use crate::bridges::BridgeError;
use sctrk_common::events::{ScanEvent, ScanPhase};
use sctrk_common::time;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// User-facing feedback requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// New session started
    SessionStarted,
    /// Item accepted
    ItemAccepted,
    /// Every expected item scanned
    BatchComplete,
    /// Location commit confirmed
    CommitSucceeded,
    /// Location commit failed or reverted
    CommitFailed,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Presenter feedback
    Signal(Signal),

    /// Broadcast an event
    Publish(ScanEvent),

    /// Launch the detached batch size lookup
    LookupBatchSize {
        session_id: SessionId,
        identifier: String,
    },

    /// Launch the detached pool resolution + location commit
    CommitBatch {
        session_id: SessionId,
        first_item: String,
        destination: String,
    },
}

/// Result of a detached location commit
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Ledger confirmed the write
    Confirmed { tx_hash: String },

    /// Write failed or was reverted
    Failed {
        tx_hash: Option<String>,
        error: BridgeError,
    },

    /// Pool could not be resolved; nothing was written
    Abandoned(BridgeError),
}

impl StoreInner {
    /// Replace the session with a fresh one that is already scanning
    pub(crate) fn reset(&mut self) -> Vec<Effect> {
        let epoch = self.bump_epoch();
        self.session = Session::started(Uuid::new_v4(), epoch);

        info!("New scan started (session {})", self.session.id);
        if self.route.arrived() {
            info!("Status: arrived at final destination");
        } else {
            info!("Current location: {}", self.route.current_destination());
        }

        vec![
            Effect::Signal(Signal::SessionStarted),
            Effect::Publish(ScanEvent::SessionReset {
                session_id: self.session.id,
                destination: self.route.current_destination().to_string(),
                arrived: self.route.arrived(),
                timestamp: time::now(),
            }),
        ]
    }

    /// Decode worker write: `Scanning` → `ItemPendingAccept`
    pub(crate) fn record_decode(
        &mut self,
        epoch: u64,
        value: &str,
        confidence: f32,
        policy: &SessionPolicy,
    ) -> DecodeVerdict {
        if !self.session.phase.is_scanning() {
            return DecodeVerdict::NotScanning;
        }
        if epoch != self.session.scan_epoch {
            return DecodeVerdict::StaleFrame;
        }
        if value.is_empty() {
            return DecodeVerdict::EmptyValue;
        }
        if confidence.is_nan() || confidence <= policy.min_confidence_percent {
            return DecodeVerdict::BelowThreshold;
        }

        self.session.phase = ScanPhase::ItemPendingAccept;
        self.session.pending_value = Some(value.to_string());
        DecodeVerdict::Accepted
    }

    /// One evaluator step
    pub(crate) fn step(&mut self, now: Instant, policy: &SessionPolicy) -> Vec<Effect> {
        match self.session.phase {
            ScanPhase::ItemPendingAccept => self.accept_pending(now, policy),
            ScanPhase::BatchSizeKnown => self.resume_after_lookup(policy),
            _ => Vec::new(),
        }
    }

    /// Apply the batch size lookup result (`AwaitingBatchSize` → `BatchSizeKnown`)
    pub(crate) fn apply_batch_size(
        &mut self,
        session_id: SessionId,
        result: Result<usize, BridgeError>,
        policy: &SessionPolicy,
    ) -> Vec<Effect> {
        if session_id != self.session.id || self.session.phase != ScanPhase::AwaitingBatchSize {
            debug!(
                "Discarding batch size result for session {} (current session {}, phase {})",
                session_id, self.session.id, self.session.phase
            );
            return Vec::new();
        }

        self.session.lookup_in_flight = false;

        let (expected_count, fallback) = match result {
            Ok(count) => {
                info!("Total items to scan determined from ledger: {}", count.max(1));
                (count.max(1), false)
            }
            Err(e) => {
                warn!(
                    "Batch size lookup failed: {}; using default item count {}",
                    e, policy.fallback_batch_size
                );
                (policy.fallback_batch_size, true)
            }
        };

        self.session.expected_count = Some(expected_count);
        self.session.phase = ScanPhase::BatchSizeKnown;

        vec![Effect::Publish(ScanEvent::BatchSizeResolved {
            session_id,
            expected_count,
            fallback,
            timestamp: time::now(),
        })]
    }

    /// Apply the detached commit result
    ///
    /// Feedback is given even if the session has since been replaced; the
    /// in-flight flag is only cleared on the session that launched it.
    pub(crate) fn apply_commit_outcome(
        &mut self,
        session_id: SessionId,
        destination: &str,
        outcome: CommitOutcome,
    ) -> Vec<Effect> {
        if session_id == self.session.id {
            self.session.commit_in_flight = false;
        } else {
            debug!(
                "Commit result for replaced session {} (current session {})",
                session_id, self.session.id
            );
        }

        let mut effects = Vec::new();
        let (success, tx_hash, error) = match outcome {
            CommitOutcome::Confirmed { tx_hash } => {
                info!("Location update to {} confirmed (tx {})", destination, tx_hash);
                effects.push(Effect::Signal(Signal::CommitSucceeded));
                (true, Some(tx_hash), None)
            }
            CommitOutcome::Failed { tx_hash, error } => {
                error!("Location update to {} failed: {}", destination, error);
                effects.push(Effect::Signal(Signal::CommitFailed));
                (false, tx_hash, Some(error.to_string()))
            }
            CommitOutcome::Abandoned(error) => {
                warn!(
                    "Could not resolve pool for location update to {}: {}",
                    destination, error
                );
                (false, None, Some(error.to_string()))
            }
        };

        effects.push(Effect::Publish(ScanEvent::CommitFinished {
            session_id,
            destination: destination.to_string(),
            success,
            tx_hash,
            error,
            timestamp: time::now(),
        }));
        effects
    }

    fn enter_scanning(&mut self) {
        let epoch = self.bump_epoch();
        self.session.phase = ScanPhase::Scanning;
        self.session.pending_value = None;
        self.session.scan_epoch = epoch;
    }

    fn accept_pending(&mut self, now: Instant, policy: &SessionPolicy) -> Vec<Effect> {
        let Some(value) = self.session.pending_value.clone() else {
            warn!("Pending phase without a decoded value, resuming scan");
            self.enter_scanning();
            return Vec::new();
        };

        if self.session.contains(&value) {
            return self.handle_duplicate(value, now, policy);
        }

        self.session.scanned_items.push(value.clone());
        self.session.pending_value = None;
        self.session.last_accepted_at = Some(now);

        let index = self.session.current_index();
        let mut effects = vec![
            Effect::Signal(Signal::ItemAccepted),
            Effect::Publish(ScanEvent::ItemAccepted {
                session_id: self.session.id,
                value: value.clone(),
                current_index: index,
                expected_count: self.session.expected_count,
                timestamp: time::now(),
            }),
        ];

        if index == 1 {
            info!("First item scanned, resolving batch size from ledger");
            self.session.phase = ScanPhase::AwaitingBatchSize;
            self.session.lookup_in_flight = true;
            effects.push(Effect::LookupBatchSize {
                session_id: self.session.id,
                identifier: value,
            });
            return effects;
        }

        let expected = self
            .session
            .expected_count
            .unwrap_or(policy.fallback_batch_size);

        if index < expected {
            info!("Scanned item {}/{}", index, expected);
            self.enter_scanning();
        } else {
            effects.extend(self.complete());
        }

        effects
    }

    fn handle_duplicate(&mut self, value: String, now: Instant, policy: &SessionPolicy) -> Vec<Effect> {
        let notice_due = self
            .session
            .last_duplicate_notice_at
            .map_or(true, |t| now.saturating_duration_since(t) >= policy.duplicate_notice_interval);

        if !notice_due {
            return Vec::new();
        }

        self.session.last_duplicate_notice_at = Some(now);
        let index = self.session.current_index();
        let expected = self.session.expected_count;

        match expected {
            Some(n) => info!("Item already scanned! ({}/{})", index, n),
            None => info!("Item already scanned! ({}/?)", index),
        }

        let mut effects = vec![Effect::Publish(ScanEvent::DuplicateItem {
            session_id: self.session.id,
            value,
            current_index: index,
            expected_count: expected,
            timestamp: time::now(),
        })];

        let advance_due = self
            .session
            .last_accepted_at
            .map_or(true, |t| now.saturating_duration_since(t) >= policy.auto_advance_after);

        if advance_due {
            info!("Auto-advancing to scan item {}", index + 1);
            self.enter_scanning();
            effects.push(Effect::Publish(ScanEvent::AutoAdvanced {
                session_id: self.session.id,
                next_item: index + 1,
                timestamp: time::now(),
            }));
        }

        effects
    }

    fn resume_after_lookup(&mut self, policy: &SessionPolicy) -> Vec<Effect> {
        let expected = self
            .session
            .expected_count
            .unwrap_or(policy.fallback_batch_size);
        let index = self.session.current_index();

        if index < expected {
            info!("Scanned {}/{}, resuming scan", index, expected);
            self.enter_scanning();
            return Vec::new();
        }

        if index > expected {
            // Late result below what was already accepted: keep every item
            warn!(
                "Batch size {} is below the {} items already scanned, completing batch",
                expected, index
            );
        }
        self.complete()
    }

    /// Batch completion: signal, launch the commit, advance the route
    fn complete(&mut self) -> Vec<Effect> {
        self.session.phase = ScanPhase::Complete;
        self.session.pending_value = None;

        let destination = self.route.current_destination().to_string();
        info!("All {} items scanned", self.session.current_index());
        for (i, item) in self.session.scanned_items.iter().enumerate() {
            info!("Item {}: {}", i + 1, item);
        }

        let mut effects = vec![Effect::Signal(Signal::BatchComplete)];

        let first_item = self.session.scanned_items.first().cloned();
        let commit_launched = match first_item {
            Some(first_item) if !self.route.arrived() => {
                info!("Updating pool location to {}", destination);
                self.session.commit_in_flight = true;
                effects.push(Effect::CommitBatch {
                    session_id: self.session.id,
                    first_item,
                    destination: destination.clone(),
                });
                true
            }
            _ => {
                info!("Status: arrived, location update skipped");
                false
            }
        };

        effects.push(Effect::Publish(ScanEvent::BatchCompleted {
            session_id: self.session.id,
            items: self.session.scanned_items.clone(),
            destination,
            commit_launched,
            timestamp: time::now(),
        }));

        if self.route.advance() {
            info!("All destinations visited, batch has arrived");
        }
        info!("Scan complete. Press the button to scan again.");

        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn inner() -> StoreInner {
        StoreInner::new(vec!["Dock_A".to_string(), "Final_Destination".to_string()])
    }

    fn policy() -> SessionPolicy {
        SessionPolicy::default()
    }

    /// Put a decode into the current scanning window
    fn decode(inner: &mut StoreInner, value: &str) -> DecodeVerdict {
        let epoch = inner.session.scan_epoch;
        inner.record_decode(epoch, value, 25.0, &policy())
    }

    /// Scan the first item and resolve the batch size
    fn start_batch(inner: &mut StoreInner, first: &str, size: usize, t0: Instant) {
        inner.reset();
        assert_eq!(decode(inner, first), DecodeVerdict::Accepted);
        inner.step(t0, &policy());
        let id = inner.session.id;
        inner.apply_batch_size(id, Ok(size), &policy());
        inner.step(t0, &policy());
    }

    fn has_lookup(effects: &[Effect]) -> bool {
        effects.iter().any(|e| matches!(e, Effect::LookupBatchSize { .. }))
    }

    fn commit_of(effects: &[Effect]) -> Option<(String, String)> {
        effects.iter().find_map(|e| match e {
            Effect::CommitBatch {
                first_item,
                destination,
                ..
            } => Some((first_item.clone(), destination.clone())),
            _ => None,
        })
    }

    fn duplicate_notices(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Publish(ScanEvent::DuplicateItem { .. })))
            .count()
    }

    #[test]
    fn test_first_item_launches_lookup() {
        let mut inner = inner();
        inner.reset();
        decode(&mut inner, "0xA");

        let effects = inner.step(Instant::now(), &policy());
        assert!(has_lookup(&effects));
        assert!(effects.contains(&Effect::Signal(Signal::ItemAccepted)));
        assert_eq!(inner.session.phase, ScanPhase::AwaitingBatchSize);
        assert_eq!(inner.session.scanned_items, vec!["0xA"]);
        assert!(inner.session.batch_processing());
        assert!(inner.session.pending_value.is_none());
    }

    #[test]
    fn test_lookup_success_resumes_scanning() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "0xA", 3, t0);

        assert_eq!(inner.session.phase, ScanPhase::Scanning);
        assert_eq!(inner.session.expected_count, Some(3));
        assert!(!inner.session.batch_processing());
    }

    #[test]
    fn test_lookup_of_one_completes_immediately() {
        let mut inner = inner();
        inner.reset();
        decode(&mut inner, "0xA");
        inner.step(Instant::now(), &policy());

        let id = inner.session.id;
        inner.apply_batch_size(id, Ok(1), &policy());
        assert_eq!(inner.session.phase, ScanPhase::BatchSizeKnown);

        let effects = inner.step(Instant::now(), &policy());
        assert_eq!(inner.session.phase, ScanPhase::Complete);
        assert_eq!(commit_of(&effects), Some(("0xA".to_string(), "Dock_A".to_string())));
    }

    #[test]
    fn test_lookup_zero_is_clamped_to_one() {
        let mut inner = inner();
        inner.reset();
        decode(&mut inner, "0xA");
        inner.step(Instant::now(), &policy());

        let id = inner.session.id;
        inner.apply_batch_size(id, Ok(0), &policy());
        assert_eq!(inner.session.expected_count, Some(1));
        inner.step(Instant::now(), &policy());
        assert_eq!(inner.session.phase, ScanPhase::Complete);
    }

    #[test]
    fn test_lookup_failure_falls_back_to_two() {
        let mut inner = inner();
        inner.reset();
        decode(&mut inner, "0xA");
        inner.step(Instant::now(), &policy());

        let id = inner.session.id;
        let effects = inner.apply_batch_size(
            id,
            Err(BridgeError::LookupFailure("no receipt".to_string())),
            &policy(),
        );
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Publish(ScanEvent::BatchSizeResolved {
                expected_count: 2,
                fallback: true,
                ..
            })
        )));

        inner.step(Instant::now(), &policy());
        assert_eq!(inner.session.expected_count, Some(2));
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
        assert!(!inner.session.batch_processing());
    }

    #[test]
    fn test_late_result_below_accepted_count_completes() {
        let mut inner = inner();
        inner.reset();
        decode(&mut inner, "0xA");
        inner.step(Instant::now(), &policy());

        // Force a second item in while the lookup is still out
        inner.session.scanned_items.push("0xB".to_string());

        let id = inner.session.id;
        inner.apply_batch_size(id, Ok(1), &policy());
        inner.step(Instant::now(), &policy());

        assert_eq!(inner.session.phase, ScanPhase::Complete);
        assert_eq!(inner.session.scanned_items, vec!["0xA", "0xB"]);
    }

    #[test]
    fn test_stale_lookup_result_discarded() {
        let mut inner = inner();
        inner.reset();
        decode(&mut inner, "0xA");
        inner.step(Instant::now(), &policy());
        let old_id = inner.session.id;

        inner.reset();
        let effects = inner.apply_batch_size(old_id, Ok(5), &policy());
        assert!(effects.is_empty());
        assert_eq!(inner.session.expected_count, None);
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
    }

    #[test]
    fn test_nth_distinct_item_completes() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "0xA", 3, t0);

        decode(&mut inner, "0xB");
        let effects = inner.step(t0, &policy());
        assert!(commit_of(&effects).is_none());
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
        assert_eq!(inner.session.current_index(), 2);

        decode(&mut inner, "0xC");
        let effects = inner.step(t0, &policy());
        assert_eq!(inner.session.phase, ScanPhase::Complete);
        assert!(effects.contains(&Effect::Signal(Signal::BatchComplete)));
        assert_eq!(inner.session.scanned_items, vec!["0xA", "0xB", "0xC"]);

        // No further transition once complete
        assert!(inner.step(t0, &policy()).is_empty());
        assert_eq!(decode(&mut inner, "0xD"), DecodeVerdict::NotScanning);
    }

    #[test]
    fn test_completion_with_two_items_commits_first_item_pool() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "A", 2, t0);

        decode(&mut inner, "B");
        let effects = inner.step(t0, &policy());

        assert_eq!(inner.session.phase, ScanPhase::Complete);
        assert_eq!(inner.session.scanned_items, vec!["A", "B"]);
        assert_eq!(commit_of(&effects), Some(("A".to_string(), "Dock_A".to_string())));
        assert!(inner.session.batch_processing());
        assert_eq!(inner.route.location_index(), 1);
    }

    #[test]
    fn test_index_matches_item_count_after_every_transition() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "0", 10, t0);
        assert_eq!(inner.session.current_index(), inner.session.scanned_items.len());

        for i in 1..10 {
            decode(&mut inner, &i.to_string());
            inner.step(t0, &policy());
            assert_eq!(inner.session.current_index(), i + 1);
            assert_eq!(inner.session.current_index(), inner.session.scanned_items.len());
            assert!(inner.session.current_index() <= inner.session.expected_count.unwrap());
        }
        assert_eq!(inner.session.phase, ScanPhase::Complete);
    }

    #[test]
    fn test_duplicate_never_appends() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "0xA", 3, t0);

        decode(&mut inner, "0xA");
        inner.step(t0 + Duration::from_millis(100), &policy());

        assert_eq!(inner.session.current_index(), 1);
        assert_eq!(inner.session.scanned_items, vec!["0xA"]);
    }

    #[test]
    fn test_duplicate_within_cooldown_stays_pending() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "0xA", 3, t0);

        decode(&mut inner, "0xA");
        let effects = inner.step(t0 + Duration::from_millis(500), &policy());
        assert_eq!(duplicate_notices(&effects), 1);
        assert_eq!(inner.session.phase, ScanPhase::ItemPendingAccept);
        assert_eq!(inner.session.pending_value.as_deref(), Some("0xA"));
    }

    #[test]
    fn test_duplicate_notices_rate_limited() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "0xA", 3, t0);

        decode(&mut inner, "0xA");
        let mut notices = 0;
        // Evaluator ticks every 100ms for 0.9s while the duplicate is pending
        for tick in 1..=9 {
            let effects = inner.step(t0 + Duration::from_millis(100 * tick), &policy());
            notices += duplicate_notices(&effects);
        }
        assert_eq!(notices, 1);

        // Next notice only after the interval has elapsed
        let effects = inner.step(t0 + Duration::from_millis(1100), &policy());
        assert_eq!(duplicate_notices(&effects), 1);
    }

    #[test]
    fn test_auto_advance_after_cooldown() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "0xA", 3, t0);
        let epoch_before = inner.session.scan_epoch;

        decode(&mut inner, "0xA");
        let effects = inner.step(t0 + Duration::from_millis(2100), &policy());

        assert_eq!(duplicate_notices(&effects), 1);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Publish(ScanEvent::AutoAdvanced { next_item: 2, .. }))));
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
        assert!(inner.session.pending_value.is_none());
        assert!(inner.session.scan_epoch > epoch_before);
        assert_eq!(inner.session.current_index(), 1);
    }

    #[test]
    fn test_no_auto_advance_before_cooldown() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "0xA", 3, t0);

        decode(&mut inner, "0xA");
        inner.step(t0 + Duration::from_millis(1900), &policy());
        assert_eq!(inner.session.phase, ScanPhase::ItemPendingAccept);

        // Throttled: next notice at 2.9s, which is also past the cooldown
        inner.step(t0 + Duration::from_millis(2500), &policy());
        assert_eq!(inner.session.phase, ScanPhase::ItemPendingAccept);
        inner.step(t0 + Duration::from_millis(2900), &policy());
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
    }

    #[test]
    fn test_route_advances_regardless_of_commit_outcome() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "A", 2, t0);
        decode(&mut inner, "B");
        inner.step(t0, &policy());
        let id = inner.session.id;

        let effects = inner.apply_commit_outcome(
            id,
            "Dock_A",
            CommitOutcome::Failed {
                tx_hash: Some("0xfeed".to_string()),
                error: BridgeError::CommitFailure("reverted".to_string()),
            },
        );
        assert!(effects.contains(&Effect::Signal(Signal::CommitFailed)));
        assert!(!inner.session.batch_processing());
        assert_eq!(inner.route.location_index(), 1);
        assert_eq!(inner.session.phase, ScanPhase::Complete);
    }

    #[test]
    fn test_commit_success_signal() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "A", 1, t0);
        let id = inner.session.id;

        let effects = inner.apply_commit_outcome(
            id,
            "Dock_A",
            CommitOutcome::Confirmed {
                tx_hash: "0xbeef".to_string(),
            },
        );
        assert!(effects.contains(&Effect::Signal(Signal::CommitSucceeded)));
        assert!(!inner.session.commit_in_flight);
    }

    #[test]
    fn test_abandoned_commit_is_silent() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "A", 1, t0);
        let id = inner.session.id;

        let effects = inner.apply_commit_outcome(
            id,
            "Dock_A",
            CommitOutcome::Abandoned(BridgeError::LookupFailure("no token".to_string())),
        );
        assert!(!effects.iter().any(|e| matches!(e, Effect::Signal(_))));
        assert!(!inner.session.batch_processing());
    }

    #[test]
    fn test_commit_result_after_reset_keeps_new_session_clean() {
        let mut inner = inner();
        let t0 = Instant::now();
        start_batch(&mut inner, "A", 1, t0);
        let old_id = inner.session.id;

        inner.reset();
        inner.apply_commit_outcome(
            old_id,
            "Dock_A",
            CommitOutcome::Confirmed {
                tx_hash: "0x1".to_string(),
            },
        );
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
        assert!(!inner.session.batch_processing());
    }

    #[test]
    fn test_arrived_after_route_wraps_suppresses_commit() {
        let mut inner = inner();
        let t0 = Instant::now();

        start_batch(&mut inner, "A", 1, t0);
        assert!(!inner.route.arrived());

        start_batch(&mut inner, "B", 1, t0);
        assert!(inner.route.arrived());
        assert_eq!(inner.route.location_index(), 0);

        inner.reset();
        decode(&mut inner, "C");
        inner.step(t0, &policy());
        let id = inner.session.id;
        inner.apply_batch_size(id, Ok(1), &policy());
        let effects = inner.step(t0, &policy());

        assert_eq!(inner.session.phase, ScanPhase::Complete);
        assert!(commit_of(&effects).is_none());
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Publish(ScanEvent::BatchCompleted {
                commit_launched: false,
                ..
            })
        )));
    }

    #[test]
    fn test_reset_during_any_phase_clears_session() {
        let t0 = Instant::now();
        let mut inner = inner();

        // Pending
        inner.reset();
        decode(&mut inner, "A");
        inner.reset();
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
        assert!(inner.session.pending_value.is_none());

        // Awaiting batch size
        decode(&mut inner, "A");
        inner.step(t0, &policy());
        inner.reset();
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
        assert!(inner.session.scanned_items.is_empty());
        assert!(!inner.session.batch_processing());

        // Complete
        start_batch(&mut inner, "A", 1, t0);
        inner.reset();
        assert_eq!(inner.session.phase, ScanPhase::Scanning);
        assert_eq!(inner.session.current_index(), 0);
        assert_eq!(inner.session.expected_count, None);
    }
}
