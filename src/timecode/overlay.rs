//! Sender element
//!
//! Stamps each frame with the epoch offset, the render time and a frame
//! counter, and logs one [`SenderRecord`] per stamped frame.

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info_span, trace, Span};

use super::control::ElementControl;
use super::geometry::Band;
use super::latency::render_time_us;
use super::set::TimestampSet;
use super::validate::check_frame;
use super::{report_skip, FrameOutcome};
use crate::clock::{format_log_timestamp, unix_seconds, SystemClock, WallClock};
use crate::config::OverlayConfig;
use crate::error_throttled;
use crate::record::{RecordLog, SenderRecord};
use crate::utils::{Condition, LogThrottler};
use crate::video::frame::PlanarFrame;

/// Burns timestamp bands into outgoing frames
pub struct TimecodeOverlay {
    /// Whole seconds since the Unix epoch when the element was created
    epoch_offset_s: u64,
    /// Number of the next stamped frame
    frame_nr: u64,
    clock: Arc<dyn WallClock>,
    log: Arc<RecordLog<SenderRecord>>,
    pipeline_latency: Arc<Mutex<Option<Duration>>>,
    throttler: LogThrottler,
    span: Span,
}

impl TimecodeOverlay {
    /// Create an overlay logging to `log`, reading the system clock
    pub fn new(log: RecordLog<SenderRecord>) -> Self {
        Self::with_clock(log, Arc::new(SystemClock))
    }

    /// Create an overlay reading time from `clock`
    ///
    /// The epoch offset is taken from `clock` now and stays fixed for the
    /// lifetime of the element.
    pub fn with_clock(log: RecordLog<SenderRecord>, clock: Arc<dyn WallClock>) -> Self {
        let epoch_offset_s = unix_seconds(&clock.now());
        Self {
            epoch_offset_s,
            frame_nr: 0,
            clock,
            log: Arc::new(log),
            pipeline_latency: Arc::new(Mutex::new(None)),
            throttler: LogThrottler::default(),
            span: info_span!("timeoverlay"),
        }
    }

    /// Create an overlay from configuration
    ///
    /// A log location that cannot be opened is reported and leaves the
    /// element running without a log.
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(RecordLog::open_or_detached(&config.location))
    }

    /// Replace the span entered while processing frames
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Handle for changing settings from other threads
    pub fn control(&self) -> ElementControl<SenderRecord> {
        ElementControl::new(self.log.clone(), self.pipeline_latency.clone(), self.span.clone())
    }

    pub fn epoch_offset(&self) -> u64 {
        self.epoch_offset_s
    }

    /// Number the next stamped frame will carry
    pub fn frame_nr(&self) -> u64 {
        self.frame_nr
    }

    /// Latency last reported by the downstream pipeline
    pub fn pipeline_latency(&self) -> Option<Duration> {
        *self.pipeline_latency.lock()
    }

    pub fn set_location(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let _entered = self.span.enter();
        self.log.set_location(path)
    }

    /// Stamp one frame in place
    ///
    /// Frames without a valid timestamp, too narrow to hold a band, or too
    /// small to hold every band are passed through untouched and do not
    /// consume a frame number.
    pub fn process_frame<B>(&mut self, frame: &mut PlanarFrame<B>) -> FrameOutcome<SenderRecord>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        // Entered on a clone so `self` stays free for mutation
        let span = self.span.clone();
        let _entered = span.enter();

        if let Err(reason) = check_frame(frame, &Band::TIMESTAMP_SET) {
            report_skip(&self.throttler, reason);
            return FrameOutcome::Skipped(reason);
        }

        let now = self.clock.now();
        let set = TimestampSet {
            epoch_offset_s: self.epoch_offset_s,
            render_time_us: render_time_us(&now, self.epoch_offset_s),
            frame_nr: self.frame_nr,
        };
        let record = SenderRecord {
            timestamp: format_log_timestamp(&now),
            frame_nr: set.frame_nr,
            render_time_us: set.render_time_us,
            epoch_offset_s: set.epoch_offset_s,
        };
        trace!(
            "Stamping frame {} at {} us (pts {})",
            set.frame_nr,
            set.render_time_us,
            frame.pts()
        );

        if let Err(e) = self.log.append(&record) {
            error_throttled!(self.throttler, Condition::AppendFailed, "Failed writing record: {}", e);
        }

        set.write(frame);
        self.frame_nr += 1;
        FrameOutcome::Processed(record)
    }
}
