use crate::{CaptureConfiguration, OrientationState, SessionId};

/// Recording controller state.
///
/// Data lives inside the variant it belongs to, so combinations such as
/// "restarting while not recording" cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderPhase {
    /// No session.
    #[default]
    Idle,
    /// Applying the camera configuration for a new session.
    Configuring {
        /// Session being started.
        session_id: SessionId,
    },
    /// Writing a segment.
    Recording {
        /// Active session.
        session_id: SessionId,
        /// Index of the open segment.
        segment_index: usize,
        /// Orientation the open segment records.
        orientation: OrientationState,
    },
    /// Closing one segment and opening the next.
    RollingOver {
        /// Active session.
        session_id: SessionId,
        /// Index of the segment being closed.
        from_index: usize,
    },
    /// Closing the final segment and sealing the session.
    Stopping {
        /// Session being stopped.
        session_id: SessionId,
    },
}

impl RecorderPhase {
    /// Recording or rolling over between segments.
    pub fn is_recording(&self) -> bool {
        matches!(
            self,
            RecorderPhase::Recording { .. } | RecorderPhase::RollingOver { .. }
        )
    }

    /// True only while a seam is being cut.
    pub fn is_restarting(&self) -> bool {
        matches!(self, RecorderPhase::RollingOver { .. })
    }

    /// Session the phase belongs to, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            RecorderPhase::Idle => None,
            RecorderPhase::Configuring { session_id }
            | RecorderPhase::Recording { session_id, .. }
            | RecorderPhase::RollingOver { session_id, .. }
            | RecorderPhase::Stopping { session_id } => Some(*session_id),
        }
    }

    /// Whether a configuration change request may be accepted now.
    pub fn accepts_configuration_change(&self) -> bool {
        matches!(self, RecorderPhase::Idle | RecorderPhase::Recording { .. })
    }
}

/// Observable recorder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecorderStatus {
    /// Controller phase.
    pub phase: RecorderPhase,
    /// Latest committed device orientation.
    pub orientation: OrientationState,
    /// Active camera configuration.
    pub configuration: CaptureConfiguration,
}

impl RecorderStatus {
    /// See [`RecorderPhase::is_recording`].
    pub fn is_recording(&self) -> bool {
        self.phase.is_recording()
    }

    /// See [`RecorderPhase::is_restarting`].
    pub fn is_restarting(&self) -> bool {
        self.phase.is_restarting()
    }
}
