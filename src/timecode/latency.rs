//! Latency arithmetic
//!
//! All times are microseconds relative to an epoch offset: a whole-second
//! Unix timestamp captured by the sender at stream start and carried in the
//! frame. Working relative to it keeps the values small, and lets the
//! receiver compare its own clock against the sender's without sharing a
//! process start time.

use chrono::{DateTime, Utc};

/// Reported when no latency can be derived
pub const LATENCY_UNAVAILABLE: i64 = -1;
/// Smallest latency reported verbatim
pub const MIN_PLAUSIBLE_LATENCY_US: i64 = -1;
/// Largest latency reported verbatim (30 s)
pub const MAX_PLAUSIBLE_LATENCY_US: i64 = 30_000_000;

const MICROS_PER_SEC: i128 = 1_000_000;

/// Microseconds from `epoch_offset_s` to `now`
///
/// Saturates at the `i64` range when the offset is far from `now`, which
/// happens with a corrupted offset.
pub fn micros_since(now: &DateTime<Utc>, epoch_offset_s: u64) -> i64 {
    let secs = now.timestamp() as i128 - epoch_offset_s as i128;
    let micros = secs * MICROS_PER_SEC + now.timestamp_subsec_micros() as i128;
    micros.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Microseconds from `epoch_offset_s` to `now` as written by the sender
///
/// The sender's epoch offset is never later than its clock, so a negative
/// span only appears if the clock steps backwards; it is clamped to zero.
pub fn render_time_us(now: &DateTime<Utc>, epoch_offset_s: u64) -> u64 {
    micros_since(now, epoch_offset_s).max(0) as u64
}

/// Outcome of one latency calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    /// Sender time stamps could not be read
    Unavailable,
    /// A value was derived but lies outside the plausible window
    Implausible(i64),
    /// Plausible end-to-end latency in microseconds
    Measured(i64),
}

impl Latency {
    /// Latency to log, `LATENCY_UNAVAILABLE` unless measured
    pub fn as_micros(&self) -> i64 {
        match self {
            Latency::Measured(us) => *us,
            Latency::Unavailable | Latency::Implausible(_) => LATENCY_UNAVAILABLE,
        }
    }
}

/// Classify a raw latency against the plausible window
pub fn clamp_latency(latency_us: i64) -> Latency {
    if (MIN_PLAUSIBLE_LATENCY_US..=MAX_PLAUSIBLE_LATENCY_US).contains(&latency_us) {
        Latency::Measured(latency_us)
    } else {
        Latency::Implausible(latency_us)
    }
}

/// Derive the latency of a frame
///
/// `epoch_offset_s` and `render_time_us` are the values decoded from the
/// frame; a missing value or zero means the band was unreadable. `now_us` is
/// the receiver clock relative to the decoded epoch offset.
pub fn compute_latency(
    epoch_offset_s: Option<u64>,
    render_time_us: Option<u64>,
    now_us: i64,
) -> Latency {
    let (Some(_), Some(render)) = (
        epoch_offset_s.filter(|&v| v != 0),
        render_time_us.filter(|&v| v != 0),
    ) else {
        return Latency::Unavailable;
    };

    let latency = now_us as i128 - render as i128;
    let latency = latency.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    clamp_latency(latency)
}
