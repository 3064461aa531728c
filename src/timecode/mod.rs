//! In-pixel timecode bands
//!
//! A band is a row of 64 cells of 16x16 pixels, each cell carrying one bit
//! of a 64-bit value as black or white luma over neutral chroma. The sender
//! ([`TimecodeOverlay`]) writes three bands per frame; the receiver
//! ([`TimecodeParser`]) reads them back after the frame went through an
//! encode/transmit/decode chain and computes the end-to-end latency.

pub mod control;
pub mod decoder;
pub mod encoder;
pub mod geometry;
pub mod latency;
pub mod overlay;
pub mod parse;
pub mod set;
pub mod validate;

use tracing::debug;

use crate::utils::{Condition, LogThrottler};
use crate::warn_throttled;

pub use control::{ElementControl, LocationFollower};
pub use geometry::Band;
pub use latency::Latency;
pub use overlay::TimecodeOverlay;
pub use parse::TimecodeParser;
pub use set::{DecodedTimestamps, TimestampSet};
pub use validate::SkipReason;

/// Result of handing one frame to an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome<R> {
    /// The frame was passed through untouched
    Skipped(SkipReason),
    /// The frame was processed and `R` was logged
    Processed(R),
}

impl<R> FrameOutcome<R> {
    pub fn is_processed(&self) -> bool {
        matches!(self, FrameOutcome::Processed(_))
    }

    pub fn processed(self) -> Option<R> {
        match self {
            FrameOutcome::Processed(record) => Some(record),
            FrameOutcome::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            FrameOutcome::Skipped(reason) => Some(*reason),
            FrameOutcome::Processed(_) => None,
        }
    }
}

/// Log why a frame was skipped
///
/// A missing timestamp is routine around stream starts. Geometry problems
/// persist for the whole stream and are throttled.
pub(crate) fn report_skip(throttler: &LogThrottler, reason: SkipReason) {
    let condition = match reason {
        SkipReason::InvalidTimestamp => {
            debug!("Skipping frame: {}", reason);
            return;
        }
        SkipReason::FrameTooNarrow { .. } => Condition::FrameTooNarrow,
        SkipReason::OutOfBounds { .. } => Condition::BandOutOfBounds,
    };
    warn_throttled!(throttler, condition, "Can't process frame: {}", reason);
}
