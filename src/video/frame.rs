//! Planar video frame views
//!
//! A [`PlanarFrame`] borrows the buffer handed over by the frame source for
//! the duration of one processing call. The codec reads and writes it in
//! place and never keeps a reference past the call.

use std::fmt;
use std::ops::Range;

use super::format::{PixelFormat, Resolution};

/// Presentation timestamp in nanoseconds
///
/// `ClockTime::NONE` marks a frame that carries no valid timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u64);

impl ClockTime {
    /// Invalid timestamp sentinel
    pub const NONE: ClockTime = ClockTime(u64::MAX);
    pub const ZERO: ClockTime = ClockTime(0);

    pub fn nanos(&self) -> u64 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::NONE
    }

    /// Timestamp of the `index`th frame of a stream running at `fps`
    pub fn for_frame(index: u64, fps: u32) -> Self {
        if fps == 0 {
            return Self::NONE;
        }
        let nanos = index as u128 * 1_000_000_000 / fps as u128;
        Self(nanos.min(u64::MAX as u128 - 1) as u64)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "none");
        }
        let secs = self.0 / 1_000_000_000;
        write!(
            f,
            "{}:{:02}:{:02}.{:09}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            self.0 % 1_000_000_000
        )
    }
}

/// Location of one plane inside the frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Byte offset of the plane from the start of the buffer
    pub offset: usize,
    /// Bytes per row
    pub stride: usize,
}

/// Plane table of a planar 4:2:0 frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub format: PixelFormat,
    pub resolution: Resolution,
    /// Y, U and V planes, in that order regardless of memory order
    pub planes: [PlaneLayout; 3],
    /// Bytes between horizontally adjacent luma samples
    pub pixel_stride: usize,
}

impl FrameLayout {
    /// Tightly packed layout for the given format and resolution
    pub fn packed(format: PixelFormat, resolution: Resolution) -> Self {
        Self::with_luma_stride(format, resolution, resolution.width as usize)
    }

    /// Tightly packed I420 layout
    pub fn i420(resolution: Resolution) -> Self {
        Self::packed(PixelFormat::Yuv420, resolution)
    }

    /// Layout with a padded luma stride; chroma stride is half of it, rounded up
    pub fn with_luma_stride(format: PixelFormat, resolution: Resolution, luma_stride: usize) -> Self {
        let height = resolution.height as usize;
        let chroma_stride = luma_stride.div_ceil(2);
        let chroma_size = chroma_stride * height.div_ceil(2);
        let y = PlaneLayout {
            offset: 0,
            stride: luma_stride,
        };
        let first = PlaneLayout {
            offset: luma_stride * height,
            stride: chroma_stride,
        };
        let second = PlaneLayout {
            offset: luma_stride * height + chroma_size,
            stride: chroma_stride,
        };
        let planes = match format {
            PixelFormat::Yuv420 => [y, first, second],
            PixelFormat::Yvu420 => [y, second, first],
        };
        Self {
            format,
            resolution,
            planes,
            pixel_stride: format.luma_pixel_stride(),
        }
    }

    pub fn luma(&self) -> PlaneLayout {
        self.planes[0]
    }

    /// Byte range occupied by plane `index` (0 = Y, 1 = U, 2 = V)
    pub fn plane_range(&self, index: usize) -> Range<usize> {
        let height = self.resolution.height as usize;
        let rows = if index == 0 { height } else { height.div_ceil(2) };
        let plane = self.planes[index];
        plane.offset..plane.offset + plane.stride * rows
    }

    /// Minimum buffer size covering all three planes
    pub fn buffer_size(&self) -> usize {
        (0..3).map(|i| self.plane_range(i).end).max().unwrap_or(0)
    }
}

/// A borrowed planar frame
///
/// `B` is `&[u8]` for read-only access and `&mut [u8]` for in-place writes.
#[derive(Debug)]
pub struct PlanarFrame<B> {
    data: B,
    layout: FrameLayout,
    pts: ClockTime,
}

impl<B> PlanarFrame<B> {
    pub fn new(data: B, layout: FrameLayout, pts: ClockTime) -> Self {
        Self { data, layout, pts }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Presentation timestamp
    pub fn pts(&self) -> ClockTime {
        self.pts
    }
}

impl<B: AsRef<[u8]>> PlanarFrame<B> {
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }

    /// Read-only view of the same frame
    pub fn view(&self) -> PlanarFrame<&[u8]> {
        PlanarFrame::new(self.data.as_ref(), self.layout, self.pts)
    }
}

impl<B: AsMut<[u8]>> PlanarFrame<B> {
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }
}
