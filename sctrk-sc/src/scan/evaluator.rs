//! Scan evaluator
//!
//! Fixed-tick loop that drives every transition not triggered by a decode:
//! 1. apply ledger results that arrived since the last tick
//! 2. run one state machine step against the store
//! 3. execute the resulting effects (tones, events, detached ledger tasks)
//! 4. refresh the indicator from the new snapshot
//!
//! Effects run after the store lock is released, so a slow presenter or
//! ledger never stalls a transition.

use super::ledger::{LedgerOutcome, LedgerTasks};
use super::presenter::{indicator_for, PresenterHandle};
use crate::session::{Effect, SessionStore};
use sctrk_common::events::EventBus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Executes effects produced by store transitions
pub struct Dispatcher {
    store: Arc<SessionStore>,
    presenter: PresenterHandle,
    ledger: LedgerTasks,
    event_bus: EventBus,
}

impl Dispatcher {
    pub fn new(
        store: Arc<SessionStore>,
        presenter: PresenterHandle,
        ledger: LedgerTasks,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            presenter,
            ledger,
            event_bus,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn presenter(&self) -> &PresenterHandle {
        &self.presenter
    }

    /// Start a new session
    pub fn reset(&self) {
        let effects = self.store.reset();
        self.dispatch(effects);
        self.refresh_indicator();
    }

    pub fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Signal(signal) => self.presenter.signal(signal),
                Effect::Publish(event) => self.event_bus.emit_lossy(event),
                Effect::LookupBatchSize {
                    session_id,
                    identifier,
                } => self.ledger.spawn_batch_size_lookup(session_id, identifier),
                Effect::CommitBatch {
                    session_id,
                    first_item,
                    destination,
                } => self
                    .ledger
                    .spawn_batch_commit(session_id, first_item, destination),
            }
        }
    }

    pub fn refresh_indicator(&self) {
        self.presenter.set_indicator(indicator_for(&self.store.snapshot()));
    }

    /// Apply one ledger result
    pub fn apply_outcome(&self, outcome: LedgerOutcome) {
        let effects = match outcome {
            LedgerOutcome::BatchSize { session_id, result } => {
                self.store.apply_batch_size(session_id, result)
            }
            LedgerOutcome::Commit {
                session_id,
                destination,
                outcome,
            } => self
                .store
                .apply_commit_outcome(session_id, &destination, outcome),
        };
        self.dispatch(effects);
    }

    /// One evaluator tick at `now`
    pub fn tick(&self, outcomes: &mut mpsc::UnboundedReceiver<LedgerOutcome>, now: Instant) {
        while let Ok(outcome) = outcomes.try_recv() {
            self.apply_outcome(outcome);
        }

        let effects = self.store.evaluate(now);
        self.dispatch(effects);
        self.refresh_indicator();
    }
}

/// Spawn the evaluator tick loop
pub fn spawn_evaluator(
    dispatcher: Arc<Dispatcher>,
    mut outcomes: mpsc::UnboundedReceiver<LedgerOutcome>,
    tick: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Scan evaluator started ({}ms tick)", tick.as_millis());

        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while running.load(Ordering::Acquire) {
            interval.tick().await;
            dispatcher.tick(&mut outcomes, Instant::now());
        }

        debug!("Scan evaluator stopped");
    })
}
