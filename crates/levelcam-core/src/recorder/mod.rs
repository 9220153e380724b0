mod controller;
mod event;
mod gate;
mod handle;
mod phase;

pub use {
    controller::{RecordingController, StopOutcome},
    event::{RecordingEvent, RolloverReason},
    gate::{ConfigChangeOutcome, ConfigurationGate},
    handle::RecorderHandle,
    phase::{RecorderPhase, RecorderStatus},
};
