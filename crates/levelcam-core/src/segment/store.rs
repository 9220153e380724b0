use crate::{CoreError, CoreResult, OrientationState, Segment, SegmentFile};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tracing::{debug, instrument};

/// Ordered, append-only record of one session's segments.
///
/// Indices are contiguous from 0, at most the last segment is open, a
/// segment is closed exactly once, and nothing changes after [`seal`].
///
/// [`seal`]: SegmentStore::seal
#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    sealed: bool,
}

impl SegmentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a newly opened segment.
    ///
    /// # Errors
    ///
    /// Fails if the store is sealed, the previous segment is still open, the
    /// index is not the next one, the segment is already closed, or it starts
    /// before the previous one ended.
    #[track_caller]
    #[instrument(skip(self, segment), fields(index = segment.index))]
    pub fn append(&mut self, segment: Segment) -> CoreResult<()> {
        if self.sealed {
            return Err(store_error("store is sealed"));
        }

        if self.current().is_some() {
            return Err(store_error("previous segment is still open"));
        }

        if segment.index != self.segments.len() {
            return Err(store_error(format!(
                "expected segment index {}, got {}",
                self.segments.len(),
                segment.index
            )));
        }

        if !segment.is_open() {
            return Err(store_error("appended segment must be open"));
        }

        if let Some(previous_end) = self.segments.last().and_then(|s| s.ended_at) {
            if segment.started_at < previous_end {
                return Err(store_error(format!(
                    "segment {} starts before segment {} ended",
                    segment.index,
                    segment.index - 1
                )));
            }
        }

        debug!(
            orientation = %segment.orientation,
            started_ms = segment.started_at.as_millis(),
            "Segment appended"
        );

        self.segments.push(segment);
        Ok(())
    }

    /// Closes the open segment at `at`, recording the writer's final file.
    ///
    /// `at` is clamped so a segment never ends before it started.
    ///
    /// # Errors
    ///
    /// Fails if the store is sealed or no segment is open.
    #[track_caller]
    #[instrument(skip(self, file))]
    pub fn close_current(&mut self, at: Duration, file: SegmentFile) -> CoreResult<&Segment> {
        if self.sealed {
            return Err(store_error("store is sealed"));
        }

        let segment = match self.segments.last_mut() {
            Some(s) if s.is_open() => s,
            _ => return Err(store_error("no open segment to close")),
        };

        segment.ended_at = Some(at.max(segment.started_at));
        segment.file = file.path;
        segment.size_bytes = file.size_bytes;

        debug!(
            index = segment.index,
            duration_ms = segment.duration().unwrap_or_default().as_millis(),
            "Segment closed"
        );

        Ok(segment)
    }

    /// Changes the orientation recorded for the open segment.
    ///
    /// # Errors
    ///
    /// Fails if the store is sealed or no segment is open.
    #[track_caller]
    pub fn relabel_current(&mut self, orientation: OrientationState) -> CoreResult<&Segment> {
        if self.sealed {
            return Err(store_error("store is sealed"));
        }

        let segment = match self.segments.last_mut() {
            Some(s) if s.is_open() => s,
            _ => return Err(store_error("no open segment to relabel")),
        };

        debug!(
            index = segment.index,
            from = %segment.orientation,
            to = %orientation,
            "Segment relabelled"
        );
        segment.orientation = orientation;

        Ok(segment)
    }

    /// The open segment, if any.
    pub fn current(&self) -> Option<&Segment> {
        self.segments.last().filter(|s| s.is_open())
    }

    /// The most recently appended segment, open or not.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Number of segments recorded so far.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether no segment has been appended.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the store has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Copy of the segments in index order.
    pub fn snapshot(&self) -> Vec<Segment> {
        self.segments.clone()
    }

    /// Freezes the store and returns its segments for shared read-only use.
    ///
    /// # Errors
    ///
    /// Fails if a segment is still open or the store is already sealed.
    #[track_caller]
    pub fn seal(&mut self) -> CoreResult<Arc<[Segment]>> {
        if self.sealed {
            return Err(store_error("store is already sealed"));
        }

        if self.current().is_some() {
            return Err(store_error("cannot seal with an open segment"));
        }

        self.sealed = true;
        Ok(Arc::from(self.segments.as_slice()))
    }
}

#[track_caller]
fn store_error(reason: impl Into<String>) -> CoreError {
    CoreError::SegmentStore {
        reason: reason.into(),
        location: ErrorLocation::from(Location::caller()),
    }
}
