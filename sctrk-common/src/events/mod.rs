//! Event types for the SCTRK event system
//!
//! Provides the shared `ScanEvent` definitions and the `EventBus` used to fan
//! them out to the HTTP event stream and any other listener.

mod types;

pub use types::{Indicator, ScanPhase};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// SCTRK event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ScanEvent {
    /// A new scan session started (trigger press or reset command)
    SessionReset {
        /// New session identifier
        session_id: Uuid,
        /// Destination the next completed batch will be committed to
        destination: String,
        /// Every destination has been visited; commits are suppressed
        arrived: bool,
        /// When the session started
        timestamp: DateTime<Utc>,
    },

    /// Decoder produced a confident read that the session accepted for evaluation
    ItemDetected {
        /// Session that received the read
        session_id: Uuid,
        /// Decoded identifier
        value: String,
        /// Decoded region as a percentage of the frame area
        confidence: f32,
        /// When the read was recorded
        timestamp: DateTime<Utc>,
    },

    /// A new distinct item was appended to the batch
    ItemAccepted {
        /// Session the item belongs to
        session_id: Uuid,
        /// Accepted identifier
        value: String,
        /// Number of items accepted so far
        current_index: usize,
        /// Expected batch size (None while unknown)
        expected_count: Option<usize>,
        /// When the item was accepted
        timestamp: DateTime<Utc>,
    },

    /// An already-scanned item was presented again (throttled)
    DuplicateItem {
        /// Session the duplicate was seen in
        session_id: Uuid,
        /// Duplicate identifier
        value: String,
        /// Number of items accepted so far
        current_index: usize,
        /// Expected batch size (None while unknown)
        expected_count: Option<usize>,
        /// When the notice was issued
        timestamp: DateTime<Utc>,
    },

    /// Pending duplicate was cleared and scanning resumed
    AutoAdvanced {
        /// Session that resumed scanning
        session_id: Uuid,
        /// Index of the item being scanned next (1-based)
        next_item: usize,
        /// When scanning resumed
        timestamp: DateTime<Utc>,
    },

    /// The batch size lookup finished (or fell back)
    BatchSizeResolved {
        /// Session the lookup was launched for
        session_id: Uuid,
        /// Batch size now in effect
        expected_count: usize,
        /// True when the lookup failed and the fallback size was applied
        fallback: bool,
        /// When the result was applied
        timestamp: DateTime<Utc>,
    },

    /// Every expected item has been scanned
    BatchCompleted {
        /// Completed session
        session_id: Uuid,
        /// Items in scan order
        items: Vec<String>,
        /// Destination recorded for this batch
        destination: String,
        /// A location commit was launched for this batch
        commit_launched: bool,
        /// When the batch completed
        timestamp: DateTime<Utc>,
    },

    /// The detached location commit finished
    CommitFinished {
        /// Session the commit was launched for
        session_id: Uuid,
        /// Destination written to the ledger
        destination: String,
        /// Ledger confirmed the write
        success: bool,
        /// Submitted transaction hash, if the write got that far
        tx_hash: Option<String>,
        /// Failure description, if any
        error: Option<String>,
        /// When the result was applied
        timestamp: DateTime<Utc>,
    },

    /// Presenter indicator changed
    IndicatorChanged {
        /// New indicator state
        indicator: Indicator,
        /// When the indicator changed
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEvent::SessionReset { .. } => "SessionReset",
            ScanEvent::ItemDetected { .. } => "ItemDetected",
            ScanEvent::ItemAccepted { .. } => "ItemAccepted",
            ScanEvent::DuplicateItem { .. } => "DuplicateItem",
            ScanEvent::AutoAdvanced { .. } => "AutoAdvanced",
            ScanEvent::BatchSizeResolved { .. } => "BatchSizeResolved",
            ScanEvent::BatchCompleted { .. } => "BatchCompleted",
            ScanEvent::CommitFinished { .. } => "CommitFinished",
            ScanEvent::IndicatorChanged { .. } => "IndicatorChanged",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use sctrk_common::events::{EventBus, Indicator, ScanEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ScanEvent::IndicatorChanged {
///     indicator: Indicator::Scanning,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ScanEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: ScanEvent) -> Result<usize, broadcast::error::SendError<ScanEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ScanEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicator_event(indicator: Indicator) -> ScanEvent {
        ScanEvent::IndicatorChanged {
            indicator,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(indicator_event(Indicator::Idle)).is_err());
        // Lossy emit never fails
        bus.emit_lossy(indicator_event(Indicator::Idle));
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let sent = bus.emit(indicator_event(Indicator::Scanning)).unwrap();
        assert_eq!(sent, 2);

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1, e2);
        assert_eq!(e1.event_type(), "IndicatorChanged");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ScanEvent::BatchSizeResolved {
            session_id: Uuid::nil(),
            expected_count: 3,
            fallback: false,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "BatchSizeResolved");
        assert_eq!(json["expected_count"], 3);

        let back: ScanEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), event.event_type());
    }

    #[test]
    fn test_capacity_reported() {
        let bus = EventBus::new(42);
        assert_eq!(bus.capacity(), 42);
    }
}
