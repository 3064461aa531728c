//! Band geometry
//!
//! Maps a band index to the byte positions of its bit-cells in the three
//! planes. The constants are shared by encoder and decoder and must not
//! change, otherwise previously marked streams become unreadable.

use std::fmt;
use std::ops::Range;

use crate::video::frame::FrameLayout;

/// Edge length of one bit-cell in luma samples
pub const CELL_SIZE: usize = 16;
/// Bits carried by one band
pub const BITS_PER_BAND: usize = 64;
/// Number of addressable bands
pub const BAND_COUNT: u8 = 8;
/// Luma row of band 0
pub const ORIGIN_ROW: usize = 52;
/// Frame width the horizontal origin was laid out for
pub const REFERENCE_WIDTH: usize = 1920;
/// Horizontal origin of every band
pub const ORIGIN_X: usize = REFERENCE_WIDTH - 896;
/// Chroma value painted under every band
pub const NEUTRAL_CHROMA: u8 = 128;

/// The horizontal origin is scaled by these factors when turned into a byte
/// offset. On a 1920-wide I420 frame this puts the band at luma column 512,
/// four rows below its nominal row, with chroma covering the same area.
const LUMA_ORIGIN_SCALE: usize = 8;
const CHROMA_ORIGIN_SCALE: usize = 4;

/// Chroma rows painted above the chroma origin
pub(crate) const CHROMA_LEAD_ROWS: usize = 2;

/// Bytes of one painted chroma row
pub(crate) const CHROMA_ROW_LEN: usize = CELL_SIZE / 2 * BITS_PER_BAND;

/// A horizontal strip carrying one 64-bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Band(u8);

impl Band {
    /// Seconds-since-epoch reference of the sending stream
    pub const EPOCH_OFFSET: Band = Band(5);
    /// Sender wall-clock time in microseconds relative to the epoch offset
    pub const RENDER_TIME: Band = Band(6);
    /// Sender frame counter
    pub const FRAME_NUMBER: Band = Band(7);

    /// Bands written and read by the elements
    pub const TIMESTAMP_SET: [Band; 3] = [Band::EPOCH_OFFSET, Band::RENDER_TIME, Band::FRAME_NUMBER];

    pub fn new(index: u8) -> Option<Self> {
        (index < BAND_COUNT).then_some(Self(index))
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Luma row the band is anchored to
    pub fn row(&self) -> usize {
        ORIGIN_ROW + self.index() * CELL_SIZE
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute byte offsets of a band's origin in each plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandOffsets {
    pub y: usize,
    pub u: usize,
    pub v: usize,
}

/// Resolve the origin of `band` in each plane of `layout`
pub fn band_offsets(layout: &FrameLayout, band: Band) -> BandOffsets {
    let row = band.row();
    let [y, u, v] = layout.planes;
    BandOffsets {
        y: y.offset + row * y.stride + ORIGIN_X * LUMA_ORIGIN_SCALE,
        u: u.offset + row * u.stride / 2 + ORIGIN_X * CHROMA_ORIGIN_SCALE,
        v: v.offset + row * v.stride / 2 + ORIGIN_X * CHROMA_ORIGIN_SCALE,
    }
}

/// Smallest luma stride able to hold one band
pub fn required_luma_stride(pixel_stride: usize) -> usize {
    8 * pixel_stride * BITS_PER_BAND
}

/// Byte ranges touched when encoding or decoding `band`, per plane
///
/// Returns `None` when the range cannot be expressed (the chroma lead rows
/// would start before the buffer).
pub fn band_footprint(layout: &FrameLayout, band: Band) -> Option<[Range<usize>; 3]> {
    let offsets = band_offsets(layout, band);
    let [y, u, v] = layout.planes;

    let luma_end = offsets
        .y
        .checked_add((CELL_SIZE - 1).checked_mul(y.stride)?)?
        .checked_add(BITS_PER_BAND * CELL_SIZE)?;

    let chroma = |origin: usize, stride: usize| -> Option<Range<usize>> {
        let start = origin.checked_sub(CHROMA_LEAD_ROWS * stride)?;
        let last_row = CELL_SIZE / 2 - 1 - CHROMA_LEAD_ROWS;
        let end = origin
            .checked_add(last_row.checked_mul(stride)?)?
            .checked_add(CHROMA_ROW_LEN)?;
        Some(start..end)
    };

    Some([
        offsets.y..luma_end,
        chroma(offsets.u, u.stride)?,
        chroma(offsets.v, v.stride)?,
    ])
}
