use crate::OrientationState;

use std::time::Duration;

/// Device attitude in radians.
///
/// `roll` is the rotation about the screen normal (positive is
/// counter-clockwise seen from the front, zero is upright portrait).
/// `pitch` is the tilt of the screen away from vertical (positive tips the
/// screen up towards the sky, ±π/2 is lying flat).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    /// Tilt away from vertical.
    pub pitch: f64,
    /// Rotation about the screen normal.
    pub roll: f64,
}

/// One reading from the attitude sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    /// When the reading was taken, on the session clock's timeline.
    pub timestamp: Duration,
    /// The reading, or `None` when the sensor had no attitude to report.
    pub attitude: Option<Attitude>,
}

impl OrientationSample {
    /// A sample with a valid attitude.
    pub fn new(timestamp: Duration, pitch: f64, roll: f64) -> Self {
        Self {
            timestamp,
            attitude: Some(Attitude { pitch, roll }),
        }
    }

    /// A sample taken while the sensor could not report attitude.
    pub fn unavailable(timestamp: Duration) -> Self {
        Self {
            timestamp,
            attitude: None,
        }
    }
}

/// A committed orientation transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationChange {
    /// Previously committed state.
    pub from: OrientationState,
    /// Newly committed state.
    pub to: OrientationState,
    /// Instant the transition was committed.
    pub at: Duration,
}
