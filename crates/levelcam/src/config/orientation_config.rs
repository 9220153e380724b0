use crate::config::{
    default_dwell_ms, default_flat_threshold_deg, default_landscape_threshold_deg,
};

use std::time::Duration;

use levelcam_core::{ClassifierConfig, OrientationState};
use serde::{Deserialize, Serialize};

/// Orientation classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrientationConfig {
    /// How long a new orientation must hold before it is committed.
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
    /// Roll angle beyond which the device counts as landscape.
    #[serde(default = "default_landscape_threshold_deg")]
    pub landscape_threshold_deg: f64,
    /// Pitch angle beyond which the device counts as lying flat.
    #[serde(default = "default_flat_threshold_deg")]
    pub flat_threshold_deg: f64,
    /// Pins the capture orientation regardless of the sensor.
    #[serde(default)]
    pub landscape_lock: Option<OrientationState>,
}

impl OrientationConfig {
    /// Classifier settings in the units the core expects.
    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            dwell: Duration::from_millis(self.dwell_ms),
            landscape_threshold: self.landscape_threshold_deg.to_radians(),
            flat_threshold: self.flat_threshold_deg.to_radians(),
            lock: self.landscape_lock,
        }
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            dwell_ms: default_dwell_ms(),
            landscape_threshold_deg: default_landscape_threshold_deg(),
            flat_threshold_deg: default_flat_threshold_deg(),
            landscape_lock: None,
        }
    }
}
