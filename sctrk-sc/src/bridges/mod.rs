//! Collaborator contracts consumed by the scan engine
//!
//! Camera capture, identifier decoding, ledger access, audio/visual feedback
//! and the trigger input are external services. The engine only sees the
//! narrow traits defined here; adapters for real hardware or a real ledger
//! client live behind them.
//!
//! Blocking collaborators (camera, decoder, trigger) expose synchronous
//! methods and are driven from threads or blocking tasks. Ledger and
//! presenter calls are asynchronous.

pub mod http_ledger;
pub mod sim;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sctrk_common::events::Indicator;
use sctrk_common::identifier::normalize_tx_ref;
use std::time::Duration;
use thiserror::Error;

/// Collaborator failure taxonomy
///
/// None of these abort the engine. Each is handled where it is raised:
/// defaults are applied, the frame is skipped, or the failure is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Collaborator not connected or not reachable
    #[error("bridge unavailable: {0}")]
    Unavailable(String),

    /// Per-frame decode problem (malformed geometry); the frame is skipped
    #[error("transient decode error: {0}")]
    DecodeTransient(String),

    /// Batch size, token or pool could not be resolved
    #[error("ledger lookup failed: {0}")]
    LookupFailure(String),

    /// Ledger write failed or was reverted
    #[error("ledger commit failed: {0}")]
    CommitFailure(String),
}

/// One captured camera frame
///
/// Pixel layout is owned by the camera/decoder pair; the engine only moves
/// frames between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Capture sequence number (monotonic per camera)
    pub sequence: u64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Raw pixel data
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Frame area in pixels
    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }
}

/// Decoder output for a frame that contained an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Decoded identifier text
    pub value: String,
    /// Area of the decoded region in pixels
    pub region_area: f64,
    /// Area of the frame in pixels
    pub frame_area: f64,
}

impl Detection {
    /// Decoded region as a percentage of the frame area
    ///
    /// Zero for degenerate frame geometry.
    pub fn confidence_percent(&self) -> f32 {
        if !self.frame_area.is_finite() || self.frame_area <= 0.0 || !self.region_area.is_finite() {
            return 0.0;
        }
        ((self.region_area / self.frame_area) * 100.0) as f32
    }
}

/// Ledger token identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u64);

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger pool/group identifier shared by every item of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub u64);

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized result of a location commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    /// Submitted transaction hash
    pub tx_hash: String,
    /// Ledger confirmed the write (false = reverted)
    pub confirmed: bool,
}

/// Audible feedback pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeepPattern {
    /// Number of tones
    pub times: u32,
    /// Duration of each tone
    pub on: Duration,
    /// Silence between tones
    pub pause: Duration,
}

impl BeepPattern {
    pub const fn new(times: u32, on_ms: u64, pause_ms: u64) -> Self {
        Self {
            times,
            on: Duration::from_millis(on_ms),
            pause: Duration::from_millis(pause_ms),
        }
    }

    /// Total time the pattern occupies the buzzer
    pub fn total_duration(&self) -> Duration {
        if self.times == 0 {
            return Duration::ZERO;
        }
        self.on * self.times + self.pause * (self.times - 1)
    }
}

/// Camera frame source
pub trait Camera: Send + Sync {
    /// Capture the next frame
    ///
    /// `Ok(None)` means the camera returned an empty frame; the caller retries
    /// after a short delay.
    fn capture_frame(&self) -> Result<Option<Frame>, BridgeError>;
}

/// Identifier decoder
pub trait Decoder: Send + Sync {
    /// Decode one frame
    ///
    /// `Ok(None)` when the frame holds no readable identifier.
    /// `Err(BridgeError::DecodeTransient)` for malformed geometry.
    fn decode(&self, frame: &Frame) -> Result<Option<Detection>, BridgeError>;
}

/// Ledger read access
#[async_trait]
pub trait LedgerLookup: Send + Sync {
    /// Resolve the token minted by a transaction
    async fn resolve_token_id(&self, tx_ref: &str) -> Result<TokenId, BridgeError>;

    /// Resolve the pool a token belongs to
    async fn resolve_pool_id(&self, token_id: TokenId) -> Result<PoolId, BridgeError>;

    /// Number of items registered in a pool
    async fn pool_item_count(&self, pool_id: PoolId) -> Result<usize, BridgeError>;

    /// Resolve the pool of a scanned identifier
    async fn resolve_pool_for_item(&self, identifier: &str) -> Result<PoolId, BridgeError> {
        let tx_ref = normalize_tx_ref(identifier);
        let token_id = self.resolve_token_id(&tx_ref).await?;
        self.resolve_pool_id(token_id).await
    }

    /// Expected batch size for the batch a scanned identifier belongs to
    ///
    /// An empty pool is a lookup failure.
    async fn resolve_batch_size(&self, identifier: &str) -> Result<usize, BridgeError> {
        let pool_id = self.resolve_pool_for_item(identifier).await?;
        match self.pool_item_count(pool_id).await? {
            0 => Err(BridgeError::LookupFailure(format!(
                "pool {} has no items",
                pool_id
            ))),
            count => Ok(count),
        }
    }
}

/// Ledger write access
#[async_trait]
pub trait LedgerCommit: Send + Sync {
    /// Record a new location for every item of a pool
    ///
    /// May take seconds; callers run it detached.
    async fn commit_location(
        &self,
        pool_id: PoolId,
        location: &str,
    ) -> Result<CommitReceipt, BridgeError>;
}

/// Audio/visual feedback
#[async_trait]
pub trait SignalPresenter: Send + Sync {
    /// Show an indicator state
    async fn set_indicator(&self, indicator: Indicator);

    /// Play a tone pattern (returns when the pattern is finished)
    async fn beep(&self, pattern: BeepPattern);
}

/// Polled edge source (physical button)
pub trait TriggerInput: Send + Sync {
    /// Current input level
    fn is_high(&self) -> Result<bool, BridgeError>;
}
