//! Receiver element
//!
//! Reads the timestamp bands back from each frame, derives the end-to-end
//! latency against the local clock and logs one [`ReceiverRecord`] per frame.

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, trace, Span};

use super::control::ElementControl;
use super::geometry::Band;
use super::latency::{compute_latency, micros_since, Latency};
use super::set::DecodedTimestamps;
use super::validate::check_frame;
use super::{report_skip, FrameOutcome};
use crate::clock::{format_log_timestamp, SystemClock, WallClock};
use crate::config::ParseConfig;
use crate::error_throttled;
use crate::record::{ReceiverRecord, RecordLog};
use crate::utils::{Condition, LogThrottler};
use crate::video::frame::PlanarFrame;

/// Reads timestamp bands from incoming frames
pub struct TimecodeParser {
    clock: Arc<dyn WallClock>,
    log: Arc<RecordLog<ReceiverRecord>>,
    pipeline_latency: Arc<Mutex<Option<Duration>>>,
    /// Last frame number read from a frame
    last_frame_nr: Option<u64>,
    throttler: LogThrottler,
    span: Span,
}

impl TimecodeParser {
    /// Create a parser logging to `log`, reading the system clock
    pub fn new(log: RecordLog<ReceiverRecord>) -> Self {
        Self::with_clock(log, Arc::new(SystemClock))
    }

    pub fn with_clock(log: RecordLog<ReceiverRecord>, clock: Arc<dyn WallClock>) -> Self {
        Self {
            clock,
            log: Arc::new(log),
            pipeline_latency: Arc::new(Mutex::new(None)),
            last_frame_nr: None,
            throttler: LogThrottler::default(),
            span: info_span!("timeparse"),
        }
    }

    /// Create a parser from configuration
    ///
    /// A log location that cannot be opened is reported and leaves the
    /// element running without a log.
    pub fn from_config(config: &ParseConfig) -> Self {
        Self::new(RecordLog::open_or_detached(&config.location))
    }

    /// Replace the span entered while processing frames
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Handle for changing settings from other threads
    pub fn control(&self) -> ElementControl<ReceiverRecord> {
        ElementControl::new(self.log.clone(), self.pipeline_latency.clone(), self.span.clone())
    }

    pub fn set_location(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let _entered = self.span.enter();
        self.log.set_location(path)
    }

    /// Read the bands of one frame
    ///
    /// Frames without a valid timestamp, too narrow to hold a band, or too
    /// small to hold every band are passed through and produce no record.
    /// Unreadable values are logged as `0`.
    pub fn process_frame<B: AsRef<[u8]>>(&mut self, frame: &PlanarFrame<B>) -> FrameOutcome<ReceiverRecord> {
        // Entered on a clone so `self` stays free for mutation
        let span = self.span.clone();
        let _entered = span.enter();

        if let Err(reason) = check_frame(frame, &Band::TIMESTAMP_SET) {
            report_skip(&self.throttler, reason);
            return FrameOutcome::Skipped(reason);
        }

        let decoded = DecodedTimestamps::read(frame);
        let now = self.clock.now();
        let now_us = micros_since(&now, decoded.epoch_offset_s.unwrap_or(0));
        let latency = compute_latency(decoded.epoch_offset_s, decoded.render_time_us, now_us);

        match latency {
            Latency::Unavailable => debug!(
                "Failed to read timestamps (sec_offset {:?}, render time {:?})",
                decoded.epoch_offset_s, decoded.render_time_us
            ),
            Latency::Implausible(us) => debug!("Discarding unlikely latency of {} us", us),
            Latency::Measured(us) => trace!(
                "Frame {:?} latency {} us (pipeline {:?})",
                decoded.frame_nr,
                us,
                *self.pipeline_latency.lock()
            ),
        }
        self.check_sequence(decoded.frame_nr);

        let record = ReceiverRecord {
            timestamp: format_log_timestamp(&now),
            frame_nr: decoded.frame_nr.unwrap_or(0),
            latency_us: latency.as_micros(),
            render_time_us: decoded.render_time_us.unwrap_or(0),
            now_us,
            epoch_offset_s: decoded.epoch_offset_s.unwrap_or(0),
        };
        if let Err(e) = self.log.append(&record) {
            error_throttled!(self.throttler, Condition::AppendFailed, "Failed writing record: {}", e);
        }
        FrameOutcome::Processed(record)
    }

    /// Note frame numbers that do not increase
    ///
    /// Dropped frames show up as gaps and are expected; a repeated or
    /// decreasing number means a restarted sender or a misread band.
    fn check_sequence(&mut self, frame_nr: Option<u64>) {
        let Some(frame_nr) = frame_nr else {
            return;
        };
        if let Some(last) = self.last_frame_nr {
            if frame_nr <= last {
                debug!("Frame number went from {} to {}", last, frame_nr);
            }
        }
        self.last_frame_nr = Some(frame_nr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::manual::ManualClock;
    use crate::timecode::latency::LATENCY_UNAVAILABLE;
    use crate::timecode::set::TimestampSet;
    use crate::timecode::validate::SkipReason;
    use crate::video::buffer::Yuv420pBuffer;
    use crate::video::format::Resolution;
    use crate::video::frame::ClockTime;
    use std::fs;
    use tempfile::tempdir;

    fn stamped(set: TimestampSet) -> Yuv420pBuffer {
        let mut buffer = Yuv420pBuffer::new(Resolution::HD1080);
        set.write(&mut buffer.as_frame_mut(ClockTime::ZERO));
        buffer
    }

    fn parser_at(log: RecordLog<ReceiverRecord>, secs: i64, micros: u32) -> TimecodeParser {
        TimecodeParser::with_clock(log, Arc::new(ManualClock::at(secs, micros)))
    }

    #[test]
    fn test_measures_latency() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rcvr.csv");
        let mut parser = parser_at(RecordLog::open(&path).unwrap(), 1001, 250_000);

        let buffer = stamped(TimestampSet {
            epoch_offset_s: 1000,
            render_time_us: 1_200_000,
            frame_nr: 9,
        });
        let record = parser
            .process_frame(&buffer.as_frame(ClockTime::ZERO))
            .processed()
            .unwrap();

        assert_eq!(record.frame_nr, 9);
        assert_eq!(record.now_us, 1_250_000);
        assert_eq!(record.latency_us, 50_000);
        assert_eq!(record.render_time_us, 1_200_000);
        assert_eq!(record.epoch_offset_s, 1000);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "ts\tframe_nr\tlatency\ttime_s\ttime_p\tsec_offset");
        assert_eq!(
            lines[1],
            "1970-01-01 00:16:41.250000Z\t9\t50000\t1200000\t1250000\t1000"
        );
    }

    #[test]
    fn test_unmarked_frame_logs_zeros() {
        let mut parser = parser_at(RecordLog::detached(), 1000, 0);
        let mut buffer = Yuv420pBuffer::new(Resolution::HD1080);
        buffer.fill(128, 128, 128);

        let record = parser
            .process_frame(&buffer.as_frame(ClockTime::ZERO))
            .processed()
            .unwrap();
        assert_eq!(record.frame_nr, 0);
        assert_eq!(record.render_time_us, 0);
        assert_eq!(record.epoch_offset_s, 0);
        assert_eq!(record.latency_us, LATENCY_UNAVAILABLE);
        assert_eq!(record.now_us, 1_000_000_000);
    }

    #[test]
    fn test_implausible_latency_reported_as_unavailable() {
        // Sender clock 40 s behind the receiver
        let mut parser = parser_at(RecordLog::detached(), 1041, 0);
        let buffer = stamped(TimestampSet {
            epoch_offset_s: 1000,
            render_time_us: 1_000_000,
            frame_nr: 1,
        });
        let record = parser
            .process_frame(&buffer.as_frame(ClockTime::ZERO))
            .processed()
            .unwrap();
        assert_eq!(record.now_us, 41_000_000);
        assert_eq!(record.latency_us, LATENCY_UNAVAILABLE);
    }

    #[test]
    fn test_slightly_negative_latency_is_kept() {
        let mut parser = parser_at(RecordLog::detached(), 1000, 499_999);
        let buffer = stamped(TimestampSet {
            epoch_offset_s: 1000,
            render_time_us: 500_000,
            frame_nr: 1,
        });
        let record = parser
            .process_frame(&buffer.as_frame(ClockTime::ZERO))
            .processed()
            .unwrap();
        assert_eq!(record.latency_us, -1);
    }

    #[test]
    fn test_skips_invalid_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rcvr.csv");
        let mut parser = parser_at(RecordLog::open(&path).unwrap(), 1000, 0);

        let buffer = Yuv420pBuffer::new(Resolution::HD1080);
        let outcome = parser.process_frame(&buffer.as_frame(ClockTime::NONE));
        assert_eq!(outcome.skip_reason(), Some(SkipReason::InvalidTimestamp));

        let narrow = Yuv420pBuffer::new(Resolution::new(500, 400));
        let outcome = parser.process_frame(&narrow.as_frame(ClockTime::ZERO));
        assert!(matches!(outcome.skip_reason(), Some(SkipReason::FrameTooNarrow { .. })));

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_sequence_tracking() {
        let mut parser = parser_at(RecordLog::detached(), 1000, 0);
        for nr in [3, 4, 4, 2] {
            let buffer = stamped(TimestampSet {
                epoch_offset_s: 1000,
                render_time_us: 1,
                frame_nr: nr,
            });
            assert!(parser.process_frame(&buffer.as_frame(ClockTime::ZERO)).is_processed());
        }
        assert_eq!(parser.last_frame_nr, Some(2));
    }

    #[test]
    fn test_from_config_opens_location() {
        let dir = tempdir().unwrap();
        let config = ParseConfig {
            location: dir.path().join("rcvr.csv"),
        };
        let parser = TimecodeParser::from_config(&config);
        assert_eq!(parser.control().location(), Some(config.location.clone()));

        let missing = ParseConfig {
            location: dir.path().join("missing").join("rcvr.csv"),
        };
        assert_eq!(TimecodeParser::from_config(&missing).control().location(), None);
    }

    #[test]
    fn test_injected_span_survives_sequence_tracking() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let mut parser =
                parser_at(RecordLog::detached(), 1000, 0).with_span(tracing::info_span!("receiver", stream = 3));
            assert_eq!(parser.span.metadata().map(|m| m.name()), Some("receiver"));

            for nr in [5, 6] {
                let buffer = stamped(TimestampSet {
                    epoch_offset_s: 1000,
                    render_time_us: 1,
                    frame_nr: nr,
                });
                assert!(parser.process_frame(&buffer.as_frame(ClockTime::ZERO)).is_processed());
            }
            assert_eq!(parser.last_frame_nr, Some(6));
            assert!(tracing::Span::current().is_none());
        });
    }

    #[test]
    fn test_location_change_applies_to_next_record() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let mut parser = parser_at(RecordLog::open(&first).unwrap(), 1000, 0);
        let buffer = stamped(TimestampSet {
            epoch_offset_s: 1000,
            render_time_us: 1,
            frame_nr: 0,
        });

        parser.process_frame(&buffer.as_frame(ClockTime::ZERO));
        parser.set_location(&second).unwrap();
        parser.process_frame(&buffer.as_frame(ClockTime::ZERO));
        parser.process_frame(&buffer.as_frame(ClockTime::ZERO));

        assert_eq!(fs::read_to_string(&first).unwrap().lines().count(), 2);
        assert_eq!(fs::read_to_string(&second).unwrap().lines().count(), 3);
        assert_eq!(parser.control().location(), Some(second));
    }
}
