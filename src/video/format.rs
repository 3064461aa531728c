//! Pixel format and resolution definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported pixel formats
///
/// The timecode bands are burned into 8-bit planar 4:2:0 frames only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelFormat {
    /// YUV420 planar format (I420: Y, U, V)
    #[default]
    #[serde(alias = "I420")]
    Yuv420,
    /// YVU420 planar format (YV12: Y, V, U)
    #[serde(alias = "YV12")]
    Yvu420,
}

impl PixelFormat {
    /// Bytes between horizontally adjacent luma samples
    pub fn luma_pixel_stride(&self) -> usize {
        1
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Yuv420 => "I420",
            PixelFormat::Yvu420 => "YV12",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "YUV420" | "I420" | "YU12" => Ok(PixelFormat::Yuv420),
            "YVU420" | "YV12" => Ok(PixelFormat::Yvu420),
            _ => Err(format!("Unknown pixel format: {}", s)),
        }
    }
}

/// Resolution (width x height)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const HD720: Resolution = Resolution {
        width: 1280,
        height: 720,
    };
    pub const HD1080: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Invalid resolution: {}", s))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("Invalid resolution width: {}", w))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("Invalid resolution height: {}", h))?;
        Ok(Self { width, height })
    }
}
