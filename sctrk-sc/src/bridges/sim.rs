//! Simulated collaborators
//!
//! Used by `--simulate` and by tests:
//! - `Scene`: what is currently in front of the camera
//! - `SimCamera` / `SimDecoder`: frames and decodes driven by the scene
//! - `SoftTrigger`: button pressed and released through the API
//! - `LogPresenter`: feedback written to the log
//! - `SimLedger`: in-memory ledger with one pool per scanned batch

use super::{
    BeepPattern, BridgeError, Camera, CommitReceipt, Decoder, Detection, Frame, LedgerCommit,
    LedgerLookup, PoolId, SignalPresenter, TokenId, TriggerInput,
};
use async_trait::async_trait;
use sctrk_common::events::Indicator;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Identifier held in front of the simulated camera
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    /// Identifier text the decoder will report
    pub value: String,
    /// Decoded region as a fraction of the frame area (0.0..=1.0)
    pub region_fraction: f64,
}

/// Shared simulated scene
#[derive(Debug, Default)]
pub struct Scene {
    item: Mutex<Option<SceneItem>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an item in view (replaces any current item)
    pub fn show(&self, value: impl Into<String>, region_fraction: f64) {
        let item = SceneItem {
            value: value.into(),
            region_fraction: region_fraction.clamp(0.0, 1.0),
        };
        debug!("Scene now shows {}", item.value);
        *self.item.lock().unwrap_or_else(|e| e.into_inner()) = Some(item);
    }

    /// Remove the item from view
    pub fn clear(&self) {
        *self.item.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn current(&self) -> Option<SceneItem> {
        self.item.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Camera producing blank frames at a fixed rate
pub struct SimCamera {
    width: u32,
    height: u32,
    frame_interval: Duration,
    sequence: AtomicU64,
}

impl SimCamera {
    pub fn new(width: u32, height: u32, frame_interval: Duration) -> Self {
        Self {
            width,
            height,
            frame_interval,
            sequence: AtomicU64::new(0),
        }
    }
}

impl Camera for SimCamera {
    fn capture_frame(&self) -> Result<Option<Frame>, BridgeError> {
        std::thread::sleep(self.frame_interval);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Some(Frame {
            sequence,
            width: self.width,
            height: self.height,
            pixels: Vec::new(),
        }))
    }
}

/// Decoder reporting whatever the scene shows
pub struct SimDecoder {
    scene: Arc<Scene>,
}

impl SimDecoder {
    pub fn new(scene: Arc<Scene>) -> Self {
        Self { scene }
    }
}

impl Decoder for SimDecoder {
    fn decode(&self, frame: &Frame) -> Result<Option<Detection>, BridgeError> {
        let frame_area = frame.area();
        if frame_area <= 0.0 {
            return Err(BridgeError::DecodeTransient(format!(
                "frame {} has no area",
                frame.sequence
            )));
        }

        Ok(self.scene.current().map(|item| Detection {
            value: item.value,
            region_area: frame_area * item.region_fraction,
            frame_area,
        }))
    }
}

/// Trigger input flipped in software
#[derive(Debug, Default)]
pub struct SoftTrigger {
    level: AtomicBool,
}

impl SoftTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.level.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.level.store(false, Ordering::SeqCst);
    }
}

impl TriggerInput for SoftTrigger {
    fn is_high(&self) -> Result<bool, BridgeError> {
        Ok(self.level.load(Ordering::SeqCst))
    }
}

/// Presenter writing feedback to the log
///
/// Tones take their real duration so pacing matches hardware.
#[derive(Debug, Default)]
pub struct LogPresenter;

#[async_trait]
impl SignalPresenter for LogPresenter {
    async fn set_indicator(&self, indicator: Indicator) {
        info!("Indicator: {}", indicator);
    }

    async fn beep(&self, pattern: BeepPattern) {
        debug!(
            "Beep x{} ({}ms on, {}ms pause)",
            pattern.times,
            pattern.on.as_millis(),
            pattern.pause.as_millis()
        );
        tokio::time::sleep(pattern.total_duration()).await;
    }
}

/// Location write recorded by `SimLedger`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub pool_id: PoolId,
    pub location: String,
    pub tx_hash: String,
}

/// In-memory ledger
///
/// Every identifier resolves to a token derived from its text and every
/// token to a single pool holding `batch_size` items.
#[derive(Debug)]
pub struct SimLedger {
    batch_size: usize,
    revert_commits: AtomicBool,
    commits: Mutex<Vec<RecordedCommit>>,
}

impl SimLedger {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            revert_commits: AtomicBool::new(false),
            commits: Mutex::new(Vec::new()),
        }
    }

    /// Make later commits come back reverted
    pub fn set_revert_commits(&self, revert: bool) {
        self.revert_commits.store(revert, Ordering::SeqCst);
    }

    /// Location writes seen so far
    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.commits.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LedgerLookup for SimLedger {
    async fn resolve_token_id(&self, tx_ref: &str) -> Result<TokenId, BridgeError> {
        let hex = tx_ref.trim_start_matches("0x");
        if hex.is_empty() {
            return Err(BridgeError::LookupFailure(format!(
                "no transaction for {}",
                tx_ref
            )));
        }

        // FNV-1a over the reference text
        let token = hex.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, b| {
            (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        });
        Ok(TokenId(token))
    }

    async fn resolve_pool_id(&self, _token_id: TokenId) -> Result<PoolId, BridgeError> {
        Ok(PoolId(1))
    }

    async fn pool_item_count(&self, _pool_id: PoolId) -> Result<usize, BridgeError> {
        Ok(self.batch_size)
    }
}

#[async_trait]
impl LedgerCommit for SimLedger {
    async fn commit_location(
        &self,
        pool_id: PoolId,
        location: &str,
    ) -> Result<CommitReceipt, BridgeError> {
        let mut commits = self.commits.lock().unwrap_or_else(|e| e.into_inner());
        let tx_hash = format!("0x{:064x}", commits.len() + 1);
        commits.push(RecordedCommit {
            pool_id,
            location: location.to_string(),
            tx_hash: tx_hash.clone(),
        });

        Ok(CommitReceipt {
            tx_hash,
            confirmed: !self.revert_commits.load(Ordering::SeqCst),
        })
    }
}
