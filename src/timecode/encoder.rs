//! Band encoder
//!
//! Writes a 64-bit value into a band, most significant bit first. Each bit
//! becomes a `CELL_SIZE` x `CELL_SIZE` block of black (0) or white (255)
//! luma. The chroma under the whole band is painted neutral so the marker
//! stays distinguishable from picture content after re-encoding.

use super::geometry::{
    band_offsets, Band, BITS_PER_BAND, CELL_SIZE, CHROMA_LEAD_ROWS, CHROMA_ROW_LEN, NEUTRAL_CHROMA,
};
use crate::video::frame::PlanarFrame;

/// Luma value representing a set bit
pub const LUMA_ONE: u8 = 255;
/// Luma value representing a cleared bit
pub const LUMA_ZERO: u8 = 0;

/// Luma value for bit `bit` (0 = most significant) of `value`
#[inline]
fn bit_luma(value: u64, bit: usize) -> u8 {
    if (value >> (BITS_PER_BAND - 1 - bit)) & 1 == 1 {
        LUMA_ONE
    } else {
        LUMA_ZERO
    }
}

/// Burn `value` into `band` of `frame`
///
/// Only the band's footprint is modified.
///
/// # Panics
///
/// Panics if the band footprint lies outside the frame buffer. Callers check
/// the frame with [`super::validate::check_frame`] first.
pub fn encode_band<B: AsMut<[u8]>>(frame: &mut PlanarFrame<B>, band: Band, value: u64) {
    let layout = *frame.layout();
    let offsets = band_offsets(&layout, band);
    let [y, u, v] = layout.planes;
    let data = frame.data_mut();

    for line in 0..CELL_SIZE {
        if line % 2 == 0 {
            // One chroma row spans two luma lines
            let chroma_line = line / 2;
            for (origin, stride) in [(offsets.u, u.stride), (offsets.v, v.stride)] {
                let start = origin + stride * chroma_line - CHROMA_LEAD_ROWS * stride;
                data[start..start + CHROMA_ROW_LEN].fill(NEUTRAL_CHROMA);
            }
        }

        let row = offsets.y + y.stride * line;
        for bit in 0..BITS_PER_BAND {
            let start = row + bit * CELL_SIZE;
            data[start..start + CELL_SIZE].fill(bit_luma(value, bit));
        }
    }
}
