//! Throttling for per-frame diagnostics
//!
//! Elements run once per frame, so a condition that persists for a whole
//! stream (a frame geometry that cannot hold a band, a log file that is
//! gone) would otherwise be reported 30 or 60 times a second. Each
//! [`Condition`] is reported at most once per interval, together with the
//! number of repeats swallowed since the last report.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Recurring conditions reported through a [`LogThrottler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Frame rows too short to hold a band
    FrameTooNarrow,
    /// A band does not fit into the frame buffer
    BandOutOfBounds,
    /// Records dropped because no log file is open
    LogDetached,
    /// Writing a record failed
    AppendFailed,
    /// A configured log location could not be opened yet
    LocationPending,
}

#[derive(Debug)]
struct Report {
    at: Instant,
    suppressed: u64,
}

/// Limits how often each [`Condition`] is logged
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use frame_timecode::utils::{Condition, LogThrottler};
///
/// let throttler = LogThrottler::new(Duration::from_secs(5));
/// assert_eq!(throttler.should_log(Condition::FrameTooNarrow), Some(0));
/// assert_eq!(throttler.should_log(Condition::FrameTooNarrow), None);
/// ```
#[derive(Debug)]
pub struct LogThrottler {
    reports: Mutex<HashMap<Condition, Report>>,
    interval: Duration,
}

impl LogThrottler {
    pub fn new(interval: Duration) -> Self {
        Self {
            reports: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// Whether `condition` should be logged now
    ///
    /// Returns the number of occurrences suppressed since the last report,
    /// or `None` while the condition is throttled.
    pub fn should_log(&self, condition: Condition) -> Option<u64> {
        let now = Instant::now();
        let mut reports = self.reports.lock();
        match reports.get_mut(&condition) {
            Some(report) if now.duration_since(report.at) < self.interval => {
                report.suppressed += 1;
                None
            }
            Some(report) => {
                let suppressed = report.suppressed;
                *report = Report { at: now, suppressed: 0 };
                Some(suppressed)
            }
            None => {
                reports.insert(condition, Report { at: now, suppressed: 0 });
                Some(0)
            }
        }
    }

    /// Forget `condition` once it recovered, so a recurrence is logged at once
    pub fn clear(&self, condition: Condition) {
        self.reports.lock().remove(&condition);
    }
}

impl Default for LogThrottler {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Throttled `warn!`, tagged with the number of suppressed repeats
#[macro_export]
macro_rules! warn_throttled {
    ($throttler:expr, $condition:expr, $($arg:tt)*) => {
        if let Some(suppressed) = $throttler.should_log($condition) {
            tracing::warn!(suppressed, $($arg)*);
        }
    };
}

/// Throttled `error!`, tagged with the number of suppressed repeats
#[macro_export]
macro_rules! error_throttled {
    ($throttler:expr, $condition:expr, $($arg:tt)*) => {
        if let Some(suppressed) = $throttler.should_log($condition) {
            tracing::error!(suppressed, $($arg)*);
        }
    };
}
