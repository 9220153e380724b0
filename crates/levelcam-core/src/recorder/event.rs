use crate::{CaptureConfiguration, JobId, OrientationState, SessionId};

use std::time::Duration;

/// Why a segment was rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverReason {
    /// The device settled into a new orientation.
    Orientation(OrientationState),
    /// The camera configuration changed mid-session.
    Configuration,
}

/// Events broadcast by the recording controller.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    /// A session started recording.
    Started {
        /// New session.
        session_id: SessionId,
    },
    /// A segment file was opened.
    SegmentOpened {
        /// Owning session.
        session_id: SessionId,
        /// Segment index.
        index: usize,
        /// Orientation recorded by the segment.
        orientation: OrientationState,
    },
    /// A segment file was finalized.
    SegmentClosed {
        /// Owning session.
        session_id: SessionId,
        /// Segment index.
        index: usize,
        /// Recorded length.
        duration: Duration,
    },
    /// The open segment turned out to start under a different orientation.
    SegmentRelabelled {
        /// Owning session.
        session_id: SessionId,
        /// Segment index.
        index: usize,
        /// Orientation now recorded for the segment.
        orientation: OrientationState,
    },
    /// A seam was cut.
    RolledOver {
        /// Owning session.
        session_id: SessionId,
        /// Index of the segment that closed.
        from_index: usize,
        /// Index of the segment that opened.
        to_index: usize,
        /// What triggered the rollover.
        reason: RolloverReason,
    },
    /// A new camera configuration is active.
    ConfigurationApplied(CaptureConfiguration),
    /// A session was sealed and handed to the export queue.
    Stopped {
        /// Sealed session.
        session_id: SessionId,
        /// Export job created for it.
        job_id: JobId,
        /// Number of segments in the session.
        segment_count: usize,
    },
    /// The session was aborted.
    Failed {
        /// Aborted session, if one was active.
        session_id: Option<SessionId>,
        /// What went wrong.
        message: String,
    },
}
