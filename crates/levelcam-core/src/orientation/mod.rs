mod classifier;
mod monitor;
mod sample;
mod state;

pub use {
    classifier::{
        ClassifierConfig, DEFAULT_DWELL, DEFAULT_FLAT_THRESHOLD, DEFAULT_LANDSCAPE_THRESHOLD,
        OrientationClassifier,
    },
    monitor::{MonitorStatus, OrientationMonitor},
    sample::{Attitude, OrientationChange, OrientationSample},
    state::OrientationState,
};
