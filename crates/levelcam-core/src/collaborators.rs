//! Capabilities the host provides to the capture pipeline.
//!
//! The core never encodes video or touches camera hardware itself. It
//! orchestrates these traits: open and close segment files, apply a camera
//! configuration, concatenate segment files, and save an artifact into the
//! media library.

use crate::{
    CaptureConfiguration, OrientationState, SessionId, error::BoxError, export::ProgressReporter,
};

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Everything the writer needs to know to open a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRequest {
    /// Session the segment belongs to.
    pub session_id: SessionId,
    /// Position of the segment within its session.
    pub index: usize,
    /// Orientation the segment is recorded under.
    pub orientation: OrientationState,
    /// Camera configuration the segment is captured with.
    pub configuration: CaptureConfiguration,
}

/// A segment file that is currently being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHandle {
    /// Position of the segment within its session.
    pub index: usize,
    /// Where the segment is being written.
    pub path: PathBuf,
}

/// A finalized segment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFile {
    /// Location of the finished file.
    pub path: PathBuf,
    /// Size of the file if the writer knows it.
    pub size_bytes: Option<u64>,
}

/// Writes one continuous segment to a file.
#[async_trait]
pub trait SegmentWriter: Send + Sync {
    /// Starts writing a new segment.
    async fn open_segment(&self, request: SegmentRequest) -> Result<SegmentHandle, BoxError>;

    /// Finalizes a segment previously returned by [`open_segment`].
    ///
    /// [`open_segment`]: SegmentWriter::open_segment
    async fn close_segment(&self, handle: SegmentHandle) -> Result<SegmentFile, BoxError>;
}

/// Applies a capture configuration to the camera hardware.
#[async_trait]
pub trait CameraConfigurator: Send + Sync {
    /// Reconfigures the capture session.
    async fn apply_configuration(&self, configuration: &CaptureConfiguration)
    -> Result<(), BoxError>;
}

/// Losslessly concatenates segment files.
#[async_trait]
pub trait Stitcher: Send + Sync {
    /// Joins `inputs` in order into a single artifact named after `output_name`.
    ///
    /// Implementations may report intermediate progress in `[0, 1]` through
    /// `progress`; the queue maps it onto the job's stitching range.
    async fn concatenate(
        &self,
        inputs: &[PathBuf],
        output_name: &str,
        progress: &ProgressReporter,
    ) -> Result<PathBuf, BoxError>;
}

/// Saves finished artifacts into the media library.
#[async_trait]
pub trait LibrarySaver: Send + Sync {
    /// Persists `artifact` under `filename`.
    async fn save(&self, artifact: &Path, filename: &str) -> Result<(), BoxError>;
}
