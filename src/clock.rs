//! Wall-clock access
//!
//! Both elements read the real-time clock once per frame. The reading goes
//! through [`WallClock`] so tests can pin "now" to a known instant.

use chrono::{DateTime, Utc};

/// Format of the timestamp column in the record logs
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6fZ";

/// Source of the current UTC time
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system real-time clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Format a time as `YYYY-MM-DD HH:MM:SS.ffffffZ`
pub fn format_log_timestamp(time: &DateTime<Utc>) -> String {
    time.format(LOG_TIMESTAMP_FORMAT).to_string()
}

/// Whole seconds since the Unix epoch, clamped at zero
pub fn unix_seconds(time: &DateTime<Utc>) -> u64 {
    time.timestamp().max(0) as u64
}
