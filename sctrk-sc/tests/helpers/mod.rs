//! Test helpers for sctrk-sc integration tests
//!
//! - `RecordingPresenter`: keeps every indicator change and tone
//! - `ScriptedLedger`: ledger with scripted batch size, failures and delay
//! - `TestRig`: engine wired to the simulated camera/decoder and the above

#![allow(dead_code)]

use async_trait::async_trait;
use sctrk_common::events::Indicator;
use sctrk_sc::bridges::sim::{Scene, SimCamera, SimDecoder, SoftTrigger};
use sctrk_sc::bridges::{
    BeepPattern, BridgeError, CommitReceipt, LedgerCommit, LedgerLookup, PoolId, SignalPresenter,
    TokenId, TriggerInput,
};
use sctrk_sc::config::ControllerConfig;
use sctrk_sc::session::SessionSnapshot;
use sctrk_sc::{EngineBridges, ScanEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Presenter that records everything it is asked to show
#[derive(Default)]
pub struct RecordingPresenter {
    indicators: Mutex<Vec<Indicator>>,
    beeps: Mutex<Vec<BeepPattern>>,
}

impl RecordingPresenter {
    pub fn indicators(&self) -> Vec<Indicator> {
        self.indicators.lock().unwrap().clone()
    }

    pub fn beeps(&self) -> Vec<BeepPattern> {
        self.beeps.lock().unwrap().clone()
    }

    pub fn count(&self, pattern: BeepPattern) -> usize {
        self.beeps().iter().filter(|p| **p == pattern).count()
    }
}

#[async_trait]
impl SignalPresenter for RecordingPresenter {
    async fn set_indicator(&self, indicator: Indicator) {
        self.indicators.lock().unwrap().push(indicator);
    }

    async fn beep(&self, pattern: BeepPattern) {
        self.beeps.lock().unwrap().push(pattern);
    }
}

/// Ledger with scripted answers
pub struct ScriptedLedger {
    pub batch_size: Mutex<usize>,
    pub lookup_error: Mutex<Option<BridgeError>>,
    pub lookup_delay: Mutex<Duration>,
    pub confirm_commits: AtomicBool,
    pub lookups: Mutex<Vec<String>>,
    pub commits: Mutex<Vec<(PoolId, String)>>,
}

impl ScriptedLedger {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: Mutex::new(batch_size),
            lookup_error: Mutex::new(None),
            lookup_delay: Mutex::new(Duration::ZERO),
            confirm_commits: AtomicBool::new(true),
            lookups: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_lookups(&self, error: BridgeError) {
        *self.lookup_error.lock().unwrap() = Some(error);
    }

    pub fn delay_lookups(&self, delay: Duration) {
        *self.lookup_delay.lock().unwrap() = delay;
    }

    pub fn revert_commits(&self) {
        self.confirm_commits.store(false, Ordering::SeqCst);
    }

    pub fn commits(&self) -> Vec<(PoolId, String)> {
        self.commits.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerLookup for ScriptedLedger {
    async fn resolve_token_id(&self, tx_ref: &str) -> Result<TokenId, BridgeError> {
        self.lookups.lock().unwrap().push(tx_ref.to_string());
        let delay = *self.lookup_delay.lock().unwrap();
        tokio::time::sleep(delay).await;

        if let Some(error) = self.lookup_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(TokenId(11))
    }

    async fn resolve_pool_id(&self, _token_id: TokenId) -> Result<PoolId, BridgeError> {
        Ok(PoolId(42))
    }

    async fn pool_item_count(&self, _pool_id: PoolId) -> Result<usize, BridgeError> {
        Ok(*self.batch_size.lock().unwrap())
    }
}

#[async_trait]
impl LedgerCommit for ScriptedLedger {
    async fn commit_location(
        &self,
        pool_id: PoolId,
        location: &str,
    ) -> Result<CommitReceipt, BridgeError> {
        self.commits
            .lock()
            .unwrap()
            .push((pool_id, location.to_string()));
        Ok(CommitReceipt {
            tx_hash: "0xfeed".to_string(),
            confirmed: self.confirm_commits.load(Ordering::SeqCst),
        })
    }
}

/// Configuration with short timings for tests
pub fn fast_config(destinations: &[&str]) -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.scanner.skip_frames = 1;
    config.scanner.evaluator_tick_ms = 10;
    config.scanner.duplicate_notice_interval_ms = 100;
    config.scanner.auto_advance_after_ms = 200;
    config.scanner.empty_frame_retry_ms = 2;
    config.scanner.idle_poll_ms = 2;
    config.scanner.shutdown_join_timeout_ms = 500;
    config.trigger.poll_interval_ms = 5;
    config.trigger.release_poll_ms = 2;
    config.trigger.settle_ms = 20;
    config.ledger.timeout_ms = 2_000;
    config.route.destinations = destinations.iter().map(|d| d.to_string()).collect();
    config
}

/// Engine plus handles on every simulated collaborator
pub struct TestRig {
    pub engine: ScanEngine,
    pub scene: Arc<Scene>,
    pub trigger: Arc<SoftTrigger>,
    pub presenter: Arc<RecordingPresenter>,
    pub ledger: Arc<ScriptedLedger>,
}

impl TestRig {
    pub fn start(config: &ControllerConfig, ledger: ScriptedLedger) -> Self {
        let scene = Arc::new(Scene::new());
        let trigger = Arc::new(SoftTrigger::new());
        let presenter = Arc::new(RecordingPresenter::default());
        let ledger = Arc::new(ledger);

        let bridges = EngineBridges {
            camera: Arc::new(SimCamera::new(64, 64, Duration::from_millis(2))),
            decoder: Arc::new(SimDecoder::new(Arc::clone(&scene))),
            lookup: ledger.clone(),
            commit: ledger.clone(),
            presenter: presenter.clone(),
            trigger: Some(trigger.clone() as Arc<dyn TriggerInput>),
        };

        let engine = ScanEngine::start(config, bridges).expect("engine should start");

        Self {
            engine,
            scene,
            trigger,
            presenter,
            ledger,
        }
    }

    /// Poll the snapshot until `predicate` holds
    pub async fn wait_for<F>(&self, what: &str, predicate: F) -> SessionSnapshot
    where
        F: Fn(&SessionSnapshot) -> bool,
    {
        for _ in 0..300 {
            let snapshot = self.engine.snapshot();
            if predicate(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {}: {:?}", what, self.engine.snapshot());
    }

    /// Poll until the presenter has played `pattern` at least `times` times
    pub async fn wait_for_beeps(&self, pattern: BeepPattern, times: usize) {
        for _ in 0..300 {
            if self.presenter.count(pattern) >= times {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "timed out waiting for {} x {:?}: {:?}",
            times,
            pattern,
            self.presenter.beeps()
        );
    }
}
