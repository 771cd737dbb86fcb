//! Utility helpers shared by the node library and binary.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the unix epoch; 0 if the system clock is before it.
pub fn now_unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| u64::try_from(since.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Render unix nanos as `<secs>.<micros>` for log lines.
pub fn format_unix_nanos(nanos: u64) -> String {
    let secs = nanos / 1_000_000_000;
    let micros = (nanos % 1_000_000_000) / 1_000;
    format!("{secs}.{micros:06}")
}
