//! Raw frame streams
//!
//! Reads and writes back-to-back planar frames of a fixed geometry, as
//! produced by `ffmpeg -f rawvideo -pix_fmt yuv420p` or a `filesink` at the
//! end of a raw video pipeline.

use std::io::{self, Read, Write};
use tracing::debug;

use crate::error::{Result, TimecodeError};
use crate::video::buffer::Yuv420pBuffer;
use crate::video::frame::{ClockTime, FrameLayout};

/// Reader yielding one frame buffer at a time
pub struct RawFrameReader<R> {
    inner: R,
    layout: FrameLayout,
    fps: u32,
    /// Frames read so far
    sequence: u64,
    /// Attach presentation timestamps derived from the frame index
    timestamps: bool,
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(inner: R, layout: FrameLayout, fps: u32) -> Self {
        Self {
            inner,
            layout,
            fps,
            sequence: 0,
            timestamps: true,
        }
    }

    /// Deliver every frame with `ClockTime::NONE` instead of a derived timestamp
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Number of frames read so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Read the next frame
    ///
    /// Returns `Ok(None)` at a clean end of stream. A trailing partial frame
    /// is an error.
    pub fn next_frame(&mut self) -> Result<Option<(Yuv420pBuffer, ClockTime)>> {
        let mut buffer = Yuv420pBuffer::with_layout(self.layout);
        let filled = read_full(&mut self.inner, buffer.as_bytes_mut())?;
        if filled == 0 {
            debug!("End of raw stream after {} frames", self.sequence);
            return Ok(None);
        }
        if filled < buffer.len() {
            return Err(TimecodeError::InvalidFrame(format!(
                "Truncated frame {}: {} of {} bytes",
                self.sequence,
                filled,
                buffer.len()
            )));
        }

        let pts = if self.timestamps {
            ClockTime::for_frame(self.sequence, self.fps)
        } else {
            ClockTime::NONE
        };
        self.sequence += 1;
        Ok(Some((buffer, pts)))
    }
}

/// Read until `buf` is full or the stream ends, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Writer for back-to-back frames
pub struct RawFrameWriter<W> {
    inner: W,
    frames: u64,
}

impl<W: Write> RawFrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, frames: 0 }
    }

    pub fn write_frame(&mut self, frame: &Yuv420pBuffer) -> Result<()> {
        self.inner.write_all(frame.as_bytes())?;
        self.frames += 1;
        Ok(())
    }

    /// Number of frames written so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::format::Resolution;
    use std::io::Cursor;

    fn layout() -> FrameLayout {
        FrameLayout::i420(Resolution::new(4, 4))
    }

    #[test]
    fn test_reads_whole_frames() {
        let data: Vec<u8> = (0..48).collect();
        let mut reader = RawFrameReader::new(Cursor::new(data), layout(), 25);

        let (first, pts) = reader.next_frame().unwrap().unwrap();
        assert_eq!(first.as_bytes(), &(0..24).collect::<Vec<u8>>()[..]);
        assert_eq!(pts, ClockTime::ZERO);

        let (_, pts) = reader.next_frame().unwrap().unwrap();
        assert_eq!(pts.nanos(), 40_000_000);

        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.sequence(), 2);
    }

    #[test]
    fn test_truncated_frame_is_error() {
        let mut reader = RawFrameReader::new(Cursor::new(vec![0u8; 30]), layout(), 25);
        assert!(reader.next_frame().unwrap().is_some());
        assert!(matches!(
            reader.next_frame(),
            Err(TimecodeError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_without_timestamps() {
        let mut reader =
            RawFrameReader::new(Cursor::new(vec![0u8; 24]), layout(), 25).without_timestamps();
        let (_, pts) = reader.next_frame().unwrap().unwrap();
        assert!(!pts.is_valid());
    }

    #[test]
    fn test_writer_round_trip() {
        let data: Vec<u8> = (0..24).collect();
        let mut reader = RawFrameReader::new(Cursor::new(data.clone()), layout(), 30);
        let (frame, _) = reader.next_frame().unwrap().unwrap();

        let mut writer = RawFrameWriter::new(Vec::new());
        writer.write_frame(&frame).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.frames(), 1);
        assert_eq!(writer.inner, data);
    }
}
