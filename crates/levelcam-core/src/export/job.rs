use crate::SessionId;

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Unique export job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of an export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    /// Waiting for a worker.
    Pending,
    /// Being stitched or saved.
    Running,
    /// Saved to the library.
    Completed,
    /// A step failed; retry is possible.
    Failed(String),
}

impl ExportState {
    /// Completed or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Completed | ExportState::Failed(_))
    }
}

/// Read-only view of an export job.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    /// Job id.
    pub id: JobId,
    /// Session being exported.
    pub session_id: SessionId,
    /// Name the artifact is saved under.
    pub filename: String,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// Fraction done, in `[0, 1]`, never decreasing.
    pub progress: f64,
    /// Current lifecycle state.
    pub state: ExportState,
    /// How many times the pipeline has been started for this job.
    pub attempts: u32,
}

impl ExportJob {
    /// Whether the artifact has been saved.
    pub fn is_completed(&self) -> bool {
        self.state == ExportState::Completed
    }

    /// Failure message, if the job failed.
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ExportState::Failed(message) => Some(message),
            _ => None,
        }
    }
}
