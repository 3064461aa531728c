//! The three values carried by every marked frame

use super::decoder::decode_band;
use super::encoder::encode_band;
use super::geometry::Band;
use crate::video::frame::PlanarFrame;

/// Values written by the sender into one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampSet {
    pub epoch_offset_s: u64,
    pub render_time_us: u64,
    pub frame_nr: u64,
}

impl TimestampSet {
    /// Burn the set into its bands
    ///
    /// The frame must have passed [`super::validate::check_frame`] for
    /// [`Band::TIMESTAMP_SET`].
    pub fn write<B: AsMut<[u8]>>(&self, frame: &mut PlanarFrame<B>) {
        encode_band(frame, Band::EPOCH_OFFSET, self.epoch_offset_s);
        encode_band(frame, Band::RENDER_TIME, self.render_time_us);
        encode_band(frame, Band::FRAME_NUMBER, self.frame_nr);
    }
}

/// Values recovered by the receiver; `None` marks an unreadable band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedTimestamps {
    pub epoch_offset_s: Option<u64>,
    pub render_time_us: Option<u64>,
    pub frame_nr: Option<u64>,
}

impl DecodedTimestamps {
    /// Read the set back from its bands
    ///
    /// The frame must have passed [`super::validate::check_frame`] for
    /// [`Band::TIMESTAMP_SET`].
    pub fn read<B: AsRef<[u8]>>(frame: &PlanarFrame<B>) -> Self {
        Self {
            epoch_offset_s: decode_band(frame, Band::EPOCH_OFFSET),
            render_time_us: decode_band(frame, Band::RENDER_TIME),
            frame_nr: decode_band(frame, Band::FRAME_NUMBER),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.epoch_offset_s.is_some() && self.render_time_us.is_some() && self.frame_nr.is_some()
    }
}

impl From<TimestampSet> for DecodedTimestamps {
    fn from(set: TimestampSet) -> Self {
        Self {
            epoch_offset_s: Some(set.epoch_offset_s),
            render_time_us: Some(set.render_time_us),
            frame_nr: Some(set.frame_nr),
        }
    }
}
