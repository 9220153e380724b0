use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete device orientation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationState {
    /// Upright, home edge down.
    Portrait,
    /// Rotated a quarter turn counter-clockwise from portrait.
    LandscapeLeft,
    /// Rotated a quarter turn clockwise from portrait.
    LandscapeRight,
    /// Rotated half a turn from portrait.
    UpsideDown,
    /// Lying flat, screen towards the sky.
    FaceUp,
    /// Lying flat, screen towards the ground.
    FaceDown,
    /// No usable attitude.
    #[default]
    Unknown,
}

impl OrientationState {
    /// States in which the capture orientation cannot be determined.
    ///
    /// The recorder never rolls over into an ambiguous state.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            OrientationState::FaceUp | OrientationState::FaceDown | OrientationState::Unknown
        )
    }

    /// Whether this is one of the two landscape states.
    pub fn is_landscape(&self) -> bool {
        matches!(
            self,
            OrientationState::LandscapeLeft | OrientationState::LandscapeRight
        )
    }
}

impl fmt::Display for OrientationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrientationState::Portrait => "portrait",
            OrientationState::LandscapeLeft => "landscape-left",
            OrientationState::LandscapeRight => "landscape-right",
            OrientationState::UpsideDown => "upside-down",
            OrientationState::FaceUp => "face-up",
            OrientationState::FaceDown => "face-down",
            OrientationState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
