use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical lens used for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lens {
    /// 0.5x ultra wide camera.
    UltraWide,
    /// 1x main camera.
    Wide,
    /// Telephoto camera.
    Telephoto,
    /// Front facing camera.
    Front,
}

/// Capture resolution presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 1280x720.
    Hd720,
    /// 1920x1080.
    Hd1080,
    /// 3840x2160.
    Uhd4k,
}

impl Resolution {
    /// Pixel dimensions in landscape order (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Hd720 => (1280, 720),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Uhd4k => (3840, 2160),
        }
    }
}

/// Camera session configuration snapshot.
///
/// Opaque to the core apart from equality: every segment records the
/// configuration it was captured under, and a segment never spans two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureConfiguration {
    /// Selected lens.
    pub lens: Lens,
    /// Selected resolution.
    pub resolution: Resolution,
    /// Frames per second.
    pub frame_rate: u32,
    /// Whether HDR video is enabled.
    pub hdr: bool,
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            lens: Lens::Wide,
            resolution: Resolution::Hd1080,
            frame_rate: 30,
            hdr: false,
        }
    }
}

impl fmt::Display for CaptureConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.resolution.dimensions();
        write!(
            f,
            "{:?} {}x{}@{}{}",
            self.lens,
            w,
            h,
            self.frame_rate,
            if self.hdr { " HDR" } else { "" }
        )
    }
}
