//! Scan session type definitions
//!
//! Supporting types for session phase and presenter indicator state.

use serde::{Deserialize, Serialize};

/// Position of a scan session in the scan/commit state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ScanPhase {
    /// No session started yet (process start, before the first reset)
    Idle,
    /// Decoder is looking for the next item
    Scanning,
    /// A confident decode is waiting for the evaluator
    ItemPendingAccept,
    /// First item accepted, batch size lookup in flight
    AwaitingBatchSize,
    /// Batch size applied, evaluator has not yet resumed scanning
    BatchSizeKnown,
    /// Every expected item has been scanned
    Complete,
}

impl ScanPhase {
    /// True while frames should be captured and decoded
    pub fn is_scanning(self) -> bool {
        matches!(self, ScanPhase::Scanning)
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "Idle"),
            ScanPhase::Scanning => write!(f, "Scanning"),
            ScanPhase::ItemPendingAccept => write!(f, "ItemPendingAccept"),
            ScanPhase::AwaitingBatchSize => write!(f, "AwaitingBatchSize"),
            ScanPhase::BatchSizeKnown => write!(f, "BatchSizeKnown"),
            ScanPhase::Complete => write!(f, "Complete"),
        }
    }
}

/// Indicator (LED) state shown by the signal presenter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    /// Actively scanning (green)
    Scanning,
    /// Ledger operation in flight (red)
    Processing,
    /// Not scanning (red)
    Idle,
    /// All indicators dark (shutdown)
    Off,
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Indicator::Scanning => write!(f, "scanning"),
            Indicator::Processing => write!(f, "processing"),
            Indicator::Idle => write!(f, "idle"),
            Indicator::Off => write!(f, "off"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_scanning_phase_scans() {
        assert!(ScanPhase::Scanning.is_scanning());
        for phase in [
            ScanPhase::Idle,
            ScanPhase::ItemPendingAccept,
            ScanPhase::AwaitingBatchSize,
            ScanPhase::BatchSizeKnown,
            ScanPhase::Complete,
        ] {
            assert!(!phase.is_scanning(), "{} should not scan", phase);
        }
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&ScanPhase::ItemPendingAccept).unwrap();
        assert_eq!(json, "\"ItemPendingAccept\"");
    }

    #[test]
    fn test_indicator_serialization() {
        let json = serde_json::to_string(&Indicator::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let back: Indicator = serde_json::from_str("\"off\"").unwrap();
        assert_eq!(back, Indicator::Off);
    }
}
