//! frame-timecode - In-band latency markers for raw video
//!
//! This crate burns wall-clock timecodes into the pixels of planar YUV
//! frames and reads them back further down a pipeline, so end-to-end
//! latency can be measured without any side-channel metadata.

pub mod clock;
pub mod config;
pub mod error;
pub mod record;
pub mod timecode;
pub mod utils;
pub mod video;

pub use error::{Result, TimecodeError};
