use crate::{CaptureConfiguration, OrientationState};

use std::{path::PathBuf, time::Duration};

/// One contiguous recorded file inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position within the session, contiguous from 0.
    pub index: usize,
    /// Orientation the segment was recorded under.
    pub orientation: OrientationState,
    /// Camera configuration the segment was captured with.
    pub configuration: CaptureConfiguration,
    /// File the segment is written to.
    pub file: PathBuf,
    /// When the segment opened.
    pub started_at: Duration,
    /// When the segment closed; `None` while still being written.
    pub ended_at: Option<Duration>,
    /// Final file size, when the writer reports one.
    pub size_bytes: Option<u64>,
}

impl Segment {
    /// Whether the segment is still being written.
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Recorded length, or `None` while open.
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at
            .map(|end| end.saturating_sub(self.started_at))
    }
}
