//! Per-frame log records
//!
//! One tab-separated line is written for every processed frame. The column
//! layout is consumed by external analysis scripts and must stay stable.

pub mod sink;

use std::fmt;

pub use sink::RecordLog;

/// A line of a record log
pub trait LogRecord: fmt::Display {
    /// Header line naming the columns
    const COLUMNS: &'static str;
}

/// Record written by the sender for every stamped frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderRecord {
    /// UTC wall-clock time, `YYYY-MM-DD HH:MM:SS.ffffffZ`
    pub timestamp: String,
    pub frame_nr: u64,
    /// Render time in microseconds relative to `epoch_offset_s`
    pub render_time_us: u64,
    pub epoch_offset_s: u64,
}

impl LogRecord for SenderRecord {
    const COLUMNS: &'static str = "ts\tframe_nr\ttime_s\tsec_offset";
}

impl fmt::Display for SenderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.timestamp, self.frame_nr, self.render_time_us, self.epoch_offset_s
        )
    }
}

/// Record written by the receiver for every inspected frame
///
/// Unreadable values are logged as `0`, an unavailable latency as `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverRecord {
    /// UTC wall-clock time, `YYYY-MM-DD HH:MM:SS.ffffffZ`
    pub timestamp: String,
    pub frame_nr: u64,
    pub latency_us: i64,
    /// Sender render time as decoded from the frame
    pub render_time_us: u64,
    /// Receiver time relative to the decoded epoch offset
    pub now_us: i64,
    pub epoch_offset_s: u64,
}

impl LogRecord for ReceiverRecord {
    const COLUMNS: &'static str = "ts\tframe_nr\tlatency\ttime_s\ttime_p\tsec_offset";
}

impl fmt::Display for ReceiverRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.timestamp,
            self.frame_nr,
            self.latency_us,
            self.render_time_us,
            self.now_us,
            self.epoch_offset_s
        )
    }
}
