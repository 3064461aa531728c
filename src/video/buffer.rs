//! Owned planar frame storage

use crate::video::format::{PixelFormat, Resolution};
use crate::video::frame::{ClockTime, FrameLayout, PlanarFrame};

/// YUV420 buffer with separate Y, U, V planes
pub struct Yuv420pBuffer {
    /// Raw buffer containing all planes
    data: Vec<u8>,
    /// Plane table describing `data`
    layout: FrameLayout,
}

impl Yuv420pBuffer {
    /// Create a black I420 buffer for the given resolution
    pub fn new(resolution: Resolution) -> Self {
        Self::with_layout(FrameLayout::i420(resolution))
    }

    /// Create a black buffer for an arbitrary layout
    pub fn with_layout(layout: FrameLayout) -> Self {
        let mut buffer = Self {
            data: vec![0u8; layout.buffer_size()],
            layout,
        };
        buffer.fill(16, 128, 128);
        buffer
    }

    /// Create a black buffer for the given format with a padded luma stride
    pub fn with_luma_stride(format: PixelFormat, resolution: Resolution, luma_stride: usize) -> Self {
        Self::with_layout(FrameLayout::with_luma_stride(format, resolution, luma_stride))
    }

    /// Set every sample of each plane to a constant
    pub fn fill(&mut self, y: u8, u: u8, v: u8) {
        for (plane, value) in [(0, y), (1, u), (2, v)] {
            let range = self.plane_range(plane);
            self.data[range].fill(value);
        }
    }

    fn plane_range(&self, plane: usize) -> std::ops::Range<usize> {
        self.layout.plane_range(plane)
    }

    /// Get the raw buffer as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the raw buffer as mutable bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get Y plane
    pub fn y_plane(&self) -> &[u8] {
        &self.data[self.plane_range(0)]
    }

    /// Get U plane
    pub fn u_plane(&self) -> &[u8] {
        &self.data[self.plane_range(1)]
    }

    /// Get V plane
    pub fn v_plane(&self) -> &[u8] {
        &self.data[self.plane_range(2)]
    }

    /// Get buffer length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Get resolution
    pub fn resolution(&self) -> Resolution {
        self.layout.resolution
    }

    /// Borrow as a read-only frame
    pub fn as_frame(&self, pts: ClockTime) -> PlanarFrame<&[u8]> {
        PlanarFrame::new(&self.data, self.layout, pts)
    }

    /// Borrow as a writable frame
    pub fn as_frame_mut(&mut self, pts: ClockTime) -> PlanarFrame<&mut [u8]> {
        PlanarFrame::new(&mut self.data, self.layout, pts)
    }
}
