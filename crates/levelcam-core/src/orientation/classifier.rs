use crate::{Attitude, OrientationChange, OrientationSample, OrientationState};

use std::{f64::consts::FRAC_PI_4, time::Duration};

use tracing::{debug, trace};

/// Default dwell window before a candidate orientation is committed.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(400);

/// Roll magnitude beyond which the device counts as landscape (45°).
pub const DEFAULT_LANDSCAPE_THRESHOLD: f64 = FRAC_PI_4;

/// Pitch magnitude beyond which the device counts as lying flat (70°).
pub const DEFAULT_FLAT_THRESHOLD: f64 = 70.0 * std::f64::consts::PI / 180.0;

/// Classifier tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    /// How long a raw candidate must persist before it is committed.
    pub dwell: Duration,
    /// Roll magnitude (radians) separating portrait from landscape.
    pub landscape_threshold: f64,
    /// Pitch magnitude (radians) at which the device is considered flat.
    pub flat_threshold: f64,
    /// Fixed orientation that overrides classification while set.
    pub lock: Option<OrientationState>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            dwell: DEFAULT_DWELL,
            landscape_threshold: DEFAULT_LANDSCAPE_THRESHOLD,
            flat_threshold: DEFAULT_FLAT_THRESHOLD,
            lock: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    state: OrientationState,
    since: Duration,
}

/// Debouncing orientation classifier.
///
/// Holds exactly one committed state and at most one pending candidate.
/// A candidate replaces the committed state only after it has been the raw
/// classification of every sample for at least the dwell window.
#[derive(Debug, Clone)]
pub struct OrientationClassifier {
    config: ClassifierConfig,
    committed: OrientationState,
    candidate: Option<Candidate>,
    sensor_available: bool,
    last_timestamp: Duration,
}

impl OrientationClassifier {
    /// Creates a classifier with nothing committed yet.
    pub fn new(config: ClassifierConfig) -> Self {
        let committed = config.lock.unwrap_or(OrientationState::Unknown);
        Self {
            config,
            committed,
            candidate: None,
            sensor_available: false,
            last_timestamp: Duration::ZERO,
        }
    }

    /// Creates a classifier that already considers `state` committed.
    pub fn starting_at(config: ClassifierConfig, state: OrientationState) -> Self {
        let mut classifier = Self::new(config);
        if config.lock.is_none() {
            classifier.committed = state;
        }
        classifier
    }

    /// The committed orientation.
    pub fn current(&self) -> OrientationState {
        self.committed
    }

    /// The candidate waiting out its dwell window, if any.
    pub fn pending(&self) -> Option<OrientationState> {
        self.candidate.map(|c| c.state)
    }

    /// Whether the most recent sample carried an attitude.
    pub fn sensor_available(&self) -> bool {
        self.sensor_available
    }

    /// The active orientation lock.
    pub fn lock(&self) -> Option<OrientationState> {
        self.config.lock
    }

    /// Maps an attitude onto a raw, undebounced orientation.
    pub fn raw_state(&self, attitude: Option<Attitude>) -> OrientationState {
        let Some(Attitude { pitch, roll }) = attitude else {
            return OrientationState::Unknown;
        };

        if !pitch.is_finite() || !roll.is_finite() {
            return OrientationState::Unknown;
        }

        if pitch.abs() >= self.config.flat_threshold {
            return if pitch > 0.0 {
                OrientationState::FaceUp
            } else {
                OrientationState::FaceDown
            };
        }

        // Fold roll into (-π, π] so a full turn maps back to portrait.
        let roll = roll.sin().atan2(roll.cos());
        let upside_down_threshold = std::f64::consts::PI - self.config.landscape_threshold;

        if roll.abs() > upside_down_threshold {
            OrientationState::UpsideDown
        } else if roll > self.config.landscape_threshold {
            OrientationState::LandscapeLeft
        } else if roll < -self.config.landscape_threshold {
            OrientationState::LandscapeRight
        } else {
            OrientationState::Portrait
        }
    }

    /// Feeds one sample, returning a change if this sample committed one.
    pub fn process(&mut self, sample: OrientationSample) -> Option<OrientationChange> {
        self.last_timestamp = self.last_timestamp.max(sample.timestamp);
        self.sensor_available = sample.attitude.is_some();

        if self.config.lock.is_some() {
            return None;
        }

        let raw = self.raw_state(sample.attitude);

        if raw == OrientationState::Unknown {
            // Missing attitude never moves the committed state.
            if self.candidate.take().is_some() {
                trace!("Pending candidate dropped, sensor reported no attitude");
            }
            return None;
        }

        if raw == self.committed {
            self.candidate = None;
            return None;
        }

        let candidate = match self.candidate {
            Some(c) if c.state == raw => c,
            _ => {
                let c = Candidate {
                    state: raw,
                    since: sample.timestamp,
                };
                trace!(candidate = %raw, "New orientation candidate");
                self.candidate = Some(c);
                c
            }
        };

        if sample.timestamp.saturating_sub(candidate.since) < self.config.dwell {
            return None;
        }

        let change = OrientationChange {
            from: self.committed,
            to: candidate.state,
            at: sample.timestamp,
        };
        self.committed = candidate.state;
        self.candidate = None;

        debug!(from = %change.from, to = %change.to, at_ms = change.at.as_millis(), "Orientation committed");

        Some(change)
    }

    /// Engages or releases the orientation lock.
    ///
    /// Engaging a lock commits the locked state immediately; the returned
    /// change is stamped with the latest sample time seen.
    pub fn set_lock(&mut self, lock: Option<OrientationState>) -> Option<OrientationChange> {
        self.config.lock = lock;
        self.candidate = None;

        let locked = lock?;
        if locked == self.committed {
            return None;
        }

        let change = OrientationChange {
            from: self.committed,
            to: locked,
            at: self.last_timestamp,
        };
        self.committed = locked;

        debug!(locked = %locked, "Orientation lock engaged");

        Some(change)
    }
}
