use crate::{CaptureConfiguration, CoreResult, Segment, SegmentStore};

use std::{fmt, sync::Arc, time::Duration};

use uuid::Uuid;

/// Unique recording session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A session that is still recording.
///
/// Owned exclusively by the recording controller.
#[derive(Debug)]
pub struct RecordingSession {
    /// Session id.
    pub id: SessionId,
    /// Configuration the session started with.
    pub configuration: CaptureConfiguration,
    /// When recording started.
    pub started_at: Duration,
    /// Segments recorded so far.
    pub segments: SegmentStore,
}

impl RecordingSession {
    /// Starts an empty session.
    pub fn new(configuration: CaptureConfiguration, started_at: Duration) -> Self {
        Self {
            id: SessionId::new(),
            configuration,
            started_at,
            segments: SegmentStore::new(),
        }
    }

    /// Seals the session once its final segment has been closed.
    ///
    /// # Errors
    ///
    /// Fails if a segment is still open.
    #[track_caller]
    pub fn seal(mut self, stopped_at: Duration) -> CoreResult<SealedSession> {
        let segments = self.segments.seal()?;
        Ok(SealedSession {
            id: self.id,
            configuration: self.configuration,
            started_at: self.started_at,
            stopped_at: stopped_at.max(self.started_at),
            segments,
        })
    }
}

/// A finished session, immutable and safe to share with the export path.
#[derive(Debug, Clone)]
pub struct SealedSession {
    /// Session id.
    pub id: SessionId,
    /// Configuration the session started with.
    pub configuration: CaptureConfiguration,
    /// When recording started.
    pub started_at: Duration,
    /// When recording stopped.
    pub stopped_at: Duration,
    /// Closed segments in index order.
    pub segments: Arc<[Segment]>,
}

impl SealedSession {
    /// Total recorded time across all segments.
    pub fn duration(&self) -> Duration {
        self.segments
            .iter()
            .filter_map(Segment::duration)
            .sum()
    }
}
