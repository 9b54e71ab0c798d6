//! Timeout helpers for bounded waits.

use std::time::Duration;

/// Convert milliseconds to Duration.
pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Presence-check delay: non-positive values fall back to `fallback_ms`.
pub fn presence_delay(requested_ms: i64, fallback_ms: u64) -> Duration {
    if requested_ms <= 0 {
        ms(fallback_ms)
    } else {
        ms(requested_ms as u64)
    }
}
