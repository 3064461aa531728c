//! Band decoder
//!
//! Reads a band back from a possibly re-encoded frame. Every bit is sampled
//! at the centre of its cell, where block-based codecs leave the fewest
//! artifacts. Two independent checks guard against reading something that
//! is not a marker:
//!
//! - a luma sample between the black and white thresholds rejects the band
//!   at once (cells blended into their neighbours),
//! - the mean U or V sample over the band drifting away from neutral
//!   rejects the band after all bits were read.
//!
//! Decoding is all-or-nothing: a band yields its full value or nothing.

use std::ops::RangeInclusive;
use tracing::trace;

use super::geometry::{band_offsets, Band, BITS_PER_BAND, CELL_SIZE};
use crate::video::frame::PlanarFrame;

/// Luma at or below this reads as a cleared bit
pub const LUMA_ZERO_MAX: u8 = 20;
/// Luma at or above this reads as a set bit
pub const LUMA_ONE_MIN: u8 = 230;
/// Accepted range of the mean chroma sample over a band
pub const CHROMA_MEAN_RANGE: RangeInclusive<u32> = 100..=156;

/// Classify a luma sample as a bit, `None` if ambiguous
#[inline]
pub fn classify_luma(luma: u8) -> Option<bool> {
    if luma >= LUMA_ONE_MIN {
        Some(true)
    } else if luma <= LUMA_ZERO_MAX {
        Some(false)
    } else {
        None
    }
}

/// Byte positions sampled for `bit`: (luma, u, v)
#[inline]
fn sample_points(
    origin: (usize, usize, usize),
    strides: (usize, usize, usize),
    bit: usize,
) -> (usize, usize, usize) {
    let (y, u, v) = origin;
    let (sy, su, sv) = strides;
    (
        y + CELL_SIZE / 2 * sy + bit * CELL_SIZE + CELL_SIZE / 2,
        u + CELL_SIZE / 2 * su / 2 + bit / 2 * CELL_SIZE + CELL_SIZE / 4,
        v + CELL_SIZE / 2 * sv / 2 + bit / 2 * CELL_SIZE + CELL_SIZE / 4,
    )
}

/// Read the value stored in `band` of `frame`
///
/// Returns `None` when the band is unreadable.
///
/// # Panics
///
/// Panics if the band footprint lies outside the frame buffer. Callers check
/// the frame with [`super::validate::check_frame`] first.
pub fn decode_band<B: AsRef<[u8]>>(frame: &PlanarFrame<B>, band: Band) -> Option<u64> {
    let layout = frame.layout();
    let offsets = band_offsets(layout, band);
    let [y, u, v] = layout.planes;
    let data = frame.data();

    let mut value = 0u64;
    let mut u_sum = 0u32;
    let mut v_sum = 0u32;

    for bit in 0..BITS_PER_BAND {
        let (yi, ui, vi) = sample_points(
            (offsets.y, offsets.u, offsets.v),
            (y.stride, u.stride, v.stride),
            bit,
        );
        let (luma, cb, cr) = (data[yi], data[ui], data[vi]);
        u_sum += cb as u32;
        v_sum += cr as u32;
        trace!("band {} bit={}: {},{},{}", band, bit, luma, cb, cr);

        match classify_luma(luma) {
            Some(true) => value |= 1u64 << (BITS_PER_BAND - 1 - bit),
            Some(false) => {}
            None => {
                trace!("band {} discarded: y_value={}", band, luma);
                return None;
            }
        }
    }

    let u_mean = u_sum / BITS_PER_BAND as u32;
    let v_mean = v_sum / BITS_PER_BAND as u32;
    if !CHROMA_MEAN_RANGE.contains(&u_mean) || !CHROMA_MEAN_RANGE.contains(&v_mean) {
        trace!(
            "band {} discarded: avg u={}, avg v={}",
            band,
            u_mean,
            v_mean
        );
        return None;
    }

    Some(value)
}
