//! Wall-clock helpers. All persisted instants are epoch milliseconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Returns the current UNIX timestamp in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Instant `days` days before `now`.
pub fn days_before(now: i64, days: i64) -> i64 {
    now - days * DAY_MS
}
