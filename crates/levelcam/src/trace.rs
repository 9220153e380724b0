//! Recorded attitude traces.
//!
//! A trace is a TOML file listing phases the device was held in:
//!
//! ```toml
//! [[phase]]
//! pitch_deg = 0.0
//! roll_deg = 0.0
//! duration_ms = 2000
//!
//! [[phase]]
//! roll_deg = 90.0
//! duration_ms = 1500
//! capture = { lens = "telephoto", resolution = "uhd4k", frame_rate = 30, hdr = false }
//!
//! [[phase]]
//! duration_ms = 300
//! sensor = false
//! ```
//!
//! Each phase is replayed as samples every [`SAMPLE_INTERVAL`]. A phase with
//! `sensor = false` produces samples without attitude. A phase carrying
//! `capture` requests that configuration as the phase begins.

use crate::{AppError, AppResult};

use std::{panic::Location, path::Path, time::Duration};

use error_location::ErrorLocation;
use levelcam_core::{CaptureConfiguration, OrientationSample};
use serde::Deserialize;
use tracing::{info, instrument};

/// Spacing of replayed samples (50 Hz, like a device motion feed).
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(20);

fn default_sensor() -> bool {
    true
}

/// One stretch of time with a constant attitude.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TracePhase {
    /// Tilt of the screen away from vertical, in degrees.
    #[serde(default)]
    pub pitch_deg: f64,
    /// Rotation about the screen normal, in degrees.
    #[serde(default)]
    pub roll_deg: f64,
    /// How long the phase lasts.
    pub duration_ms: u64,
    /// Whether the sensor reported attitude during the phase.
    #[serde(default = "default_sensor")]
    pub sensor: bool,
    /// Configuration requested when the phase begins.
    #[serde(default)]
    pub capture: Option<CaptureConfiguration>,
}

/// A whole recorded take.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trace {
    /// Phases in playback order.
    #[serde(rename = "phase", default)]
    pub phases: Vec<TracePhase>,
}

/// A sample tagged with the configuration request that starts at it, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceStep {
    /// The attitude sample.
    pub sample: OrientationSample,
    /// Configuration to request before delivering the sample.
    pub capture: Option<CaptureConfiguration>,
}

impl Trace {
    /// Reads and parses a trace file.
    #[track_caller]
    #[instrument]
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AppError::TraceError {
            reason: format!("Failed to read trace {:?}: {}", path, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let trace = Self::parse(&contents)?;

        info!(
            phases = trace.phases.len(),
            duration_ms = trace.duration().as_millis(),
            "Trace loaded"
        );

        Ok(trace)
    }

    /// Parses trace TOML.
    #[track_caller]
    pub fn parse(contents: &str) -> AppResult<Self> {
        let trace: Trace = toml::from_str(contents).map_err(|e| AppError::TraceError {
            reason: format!("Failed to parse trace: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if trace.phases.is_empty() {
            return Err(AppError::TraceError {
                reason: "Trace has no phases".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(phase) = trace
            .phases
            .iter()
            .find(|p| !p.pitch_deg.is_finite() || !p.roll_deg.is_finite())
        {
            return Err(AppError::TraceError {
                reason: format!("Phase angles must be finite: {:?}", phase),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(trace)
    }

    /// Total playback time.
    pub fn duration(&self) -> Duration {
        self.phases
            .iter()
            .map(|p| Duration::from_millis(p.duration_ms))
            .sum()
    }

    /// Expands the phases into evenly spaced samples.
    pub fn steps(&self) -> Vec<TraceStep> {
        let mut steps = Vec::new();
        let mut phase_start = Duration::ZERO;

        for phase in &self.phases {
            let phase_end = phase_start + Duration::from_millis(phase.duration_ms);
            let mut at = phase_start;
            let mut capture = phase.capture;

            while at < phase_end {
                let sample = if phase.sensor {
                    OrientationSample::new(
                        at,
                        phase.pitch_deg.to_radians(),
                        phase.roll_deg.to_radians(),
                    )
                } else {
                    OrientationSample::unavailable(at)
                };

                steps.push(TraceStep {
                    sample,
                    capture: capture.take(),
                });
                at += SAMPLE_INTERVAL;
            }

            phase_start = phase_end;
        }

        steps
    }
}
