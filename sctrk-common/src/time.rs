//! Event timestamps

use chrono::{DateTime, Utc};

/// Wall-clock timestamp stamped on every `ScanEvent`
///
/// Session timing (cooldowns, auto-advance) uses `Instant`; this is only
/// for events leaving the process.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
