use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::video::format::{PixelFormat, Resolution};
use crate::video::frame::FrameLayout;

/// Default sender log location
pub const DEFAULT_OVERLAY_LOCATION: &str = "/tmp/gsttime_sndr.csv";
/// Default receiver log location
pub const DEFAULT_PARSE_LOCATION: &str = "/tmp/gsttime_rcvr.csv";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Raw video input settings
    pub video: VideoConfig,
    /// Sender settings
    pub overlay: OverlayConfig,
    /// Receiver settings
    pub parse: ParseConfig,
}

/// Raw video input configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    /// Planar pixel format ("YUV420"/"I420" or "YVU420"/"YV12")
    pub format: PixelFormat,
    /// Resolution width
    pub width: u32,
    /// Resolution height
    pub height: u32,
    /// Frame rate, used to derive timestamps for raw input
    pub fps: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            format: PixelFormat::Yuv420,
            width: 1920,
            height: 1080,
            fps: 30,
        }
    }
}

impl VideoConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Layout of one tightly packed input frame
    pub fn layout(&self) -> FrameLayout {
        FrameLayout::packed(self.format, self.resolution())
    }
}

/// Sender configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    /// Record log location
    pub location: PathBuf,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from(DEFAULT_OVERLAY_LOCATION),
        }
    }
}

/// Receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParseConfig {
    /// Record log location
    pub location: PathBuf,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from(DEFAULT_PARSE_LOCATION),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.video.format, PixelFormat::Yuv420);
        assert_eq!(config.video.resolution(), Resolution::HD1080);
        assert_eq!(config.video.fps, 30);
        assert_eq!(config.overlay.location, PathBuf::from("/tmp/gsttime_sndr.csv"));
        assert_eq!(config.parse.location, PathBuf::from("/tmp/gsttime_rcvr.csv"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"video":{"width":1280,"height":720},"parse":{"location":"/var/log/rcvr.csv"}}"#)
                .unwrap();
        assert_eq!(config.video.resolution(), Resolution::HD720);
        assert_eq!(config.video.fps, 30);
        assert_eq!(config.parse.location, PathBuf::from("/var/log/rcvr.csv"));
        assert_eq!(config.overlay, OverlayConfig::default());
    }

    #[test]
    fn test_layout_matches_format() {
        let video = VideoConfig {
            format: PixelFormat::Yvu420,
            ..Default::default()
        };
        let layout = video.layout();
        assert_eq!(layout.format, PixelFormat::Yvu420);
        assert_eq!(layout.buffer_size(), 1920 * 1080 * 3 / 2);
    }
}
