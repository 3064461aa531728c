//! Raw video frame handling
//!
//! Frame views, owned planar buffers and raw frame streams consumed by the
//! timecode elements.

pub mod buffer;
pub mod format;
pub mod frame;
pub mod source;

pub use buffer::Yuv420pBuffer;
pub use format::{PixelFormat, Resolution};
pub use frame::{ClockTime, FrameLayout, PlanarFrame, PlaneLayout};
pub use source::{RawFrameReader, RawFrameWriter};
