//! Signal presenter driver
//!
//! Feedback requested by the engine is queued here and played back by two
//! tasks so the evaluator never waits on a tone:
//! - tones play one after another in request order
//! - the indicator follows the latest requested state (repeats are ignored)

use crate::bridges::{BeepPattern, SignalPresenter};
use crate::session::{SessionSnapshot, Signal};
use sctrk_common::events::{EventBus, Indicator, ScanEvent, ScanPhase};
use sctrk_common::time;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Tone pattern for each signal
pub fn beep_pattern(signal: Signal) -> BeepPattern {
    match signal {
        Signal::SessionStarted => BeepPattern::new(2, 200, 200),
        Signal::ItemAccepted => BeepPattern::new(1, 200, 0),
        Signal::BatchComplete => BeepPattern::new(3, 200, 200),
        Signal::CommitSucceeded => BeepPattern::new(4, 150, 150),
        Signal::CommitFailed => BeepPattern::new(1, 800, 0),
    }
}

/// Indicator state implied by a snapshot
///
/// Ledger work in flight takes precedence over the scan phase.
pub fn indicator_for(snapshot: &SessionSnapshot) -> Indicator {
    if snapshot.batch_processing {
        Indicator::Processing
    } else if snapshot.phase == ScanPhase::Scanning {
        Indicator::Scanning
    } else {
        Indicator::Idle
    }
}

/// Handle used by the engine to request feedback
pub struct PresenterHandle {
    signals: Mutex<Option<mpsc::UnboundedSender<Signal>>>,
    indicator: watch::Sender<Indicator>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PresenterHandle {
    /// Start the tone and indicator tasks
    pub fn spawn(presenter: Arc<dyn SignalPresenter>, event_bus: EventBus) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (indicator_tx, indicator_rx) = watch::channel(Indicator::Idle);

        let tone_task = tokio::spawn(tone_loop(Arc::clone(&presenter), signal_rx));
        let indicator_task = tokio::spawn(indicator_loop(presenter, indicator_rx, event_bus));

        Self {
            signals: Mutex::new(Some(signal_tx)),
            indicator: indicator_tx,
            tasks: Mutex::new(vec![tone_task, indicator_task]),
        }
    }

    /// Queue a tone pattern
    pub fn signal(&self, signal: Signal) {
        let signals = self.signals.lock().unwrap_or_else(|e| e.into_inner());
        match signals.as_ref() {
            Some(tx) if tx.send(signal).is_ok() => {}
            _ => trace!("Presenter stopped, dropping {:?}", signal),
        }
    }

    /// Request an indicator state; no-op if unchanged or switched off
    pub fn set_indicator(&self, indicator: Indicator) {
        self.indicator.send_if_modified(|current| {
            if *current == indicator || *current == Indicator::Off {
                false
            } else {
                *current = indicator;
                true
            }
        });
    }

    pub fn indicator(&self) -> Indicator {
        *self.indicator.borrow()
    }

    /// Switch the indicator off and let both tasks finish
    ///
    /// Queued tones still play before the tone task ends. Returns the task
    /// handles so the caller can bound the wait.
    pub fn shutdown(&self) -> Vec<JoinHandle<()>> {
        self.set_indicator(Indicator::Off);
        self.signals.lock().unwrap_or_else(|e| e.into_inner()).take();
        std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

async fn tone_loop(presenter: Arc<dyn SignalPresenter>, mut signals: mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = signals.recv().await {
        trace!("Playing {:?}", signal);
        presenter.beep(beep_pattern(signal)).await;
    }
    debug!("Tone task stopped");
}

async fn indicator_loop(
    presenter: Arc<dyn SignalPresenter>,
    mut indicator: watch::Receiver<Indicator>,
    event_bus: EventBus,
) {
    // Off is terminal
    loop {
        let state = *indicator.borrow_and_update();
        presenter.set_indicator(state).await;
        event_bus.emit_lossy(ScanEvent::IndicatorChanged {
            indicator: state,
            timestamp: time::now(),
        });

        if state == Indicator::Off || indicator.changed().await.is_err() {
            break;
        }
    }
    debug!("Indicator task stopped");
}
