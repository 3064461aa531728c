//! Per-frame preconditions
//!
//! Checked once per frame before any band is touched. A frame failing a
//! check is passed through untouched; that is not a stream error.

use std::fmt;

use super::geometry::{band_footprint, required_luma_stride, Band};
use crate::video::frame::PlanarFrame;

/// Why a frame was passed through without processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The frame carries no valid presentation timestamp
    InvalidTimestamp,
    /// The luma rows are too short to hold a band
    FrameTooNarrow { stride: usize, required: usize },
    /// The buffer does not contain the whole band
    OutOfBounds { band: Band },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidTimestamp => write!(f, "buffer timestamp is invalid"),
            SkipReason::FrameTooNarrow { stride, required } => write!(
                f,
                "video-frame is too narrow (stride {} < {})",
                stride, required
            ),
            SkipReason::OutOfBounds { band } => {
                write!(f, "band {} lies outside the frame buffer", band)
            }
        }
    }
}

/// Check that `frame` can carry `bands`
pub fn check_frame<B: AsRef<[u8]>>(frame: &PlanarFrame<B>, bands: &[Band]) -> Result<(), SkipReason> {
    if !frame.pts().is_valid() {
        return Err(SkipReason::InvalidTimestamp);
    }

    let layout = frame.layout();
    let stride = layout.luma().stride;
    let required = required_luma_stride(layout.pixel_stride);
    if stride < required {
        return Err(SkipReason::FrameTooNarrow { stride, required });
    }

    let len = frame.len();
    for &band in bands {
        let fits = band_footprint(layout, band)
            .map(|ranges| {
                ranges.iter().enumerate().all(|(plane, r)| {
                    let extent = layout.plane_range(plane);
                    r.start >= extent.start && r.end <= extent.end && r.end <= len
                })
            })
            .unwrap_or(false);
        if !fits {
            return Err(SkipReason::OutOfBounds { band });
        }
    }

    Ok(())
}
