use error_location::ErrorLocation;
use thiserror::Error;

/// Boxed error returned by host collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Capture and export pipeline errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The attitude sample source stopped delivering samples.
    #[error("Orientation sensor unavailable {location}")]
    SensorUnavailable {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The segment writer could not open a new segment.
    #[error("Failed to open segment {index}: {source} {location}")]
    SegmentOpenFailed {
        /// Index the segment would have had in its session.
        index: usize,
        /// Underlying collaborator error.
        #[source]
        source: BoxError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The segment writer could not finalize an open segment.
    #[error("Failed to close segment {index}: {source} {location}")]
    SegmentCloseFailed {
        /// Index of the segment being closed.
        index: usize,
        /// Underlying collaborator error.
        #[source]
        source: BoxError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The camera rejected a capture configuration.
    #[error("Failed to apply capture configuration: {source} {location}")]
    ConfigurationFailed {
        /// Underlying collaborator error.
        #[source]
        source: BoxError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Concatenating segment files failed.
    #[error("Stitching failed: {reason} {location}")]
    StitchFailed {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Handing the artifact to the media library failed.
    #[error("Saving to library failed: {reason} {location}")]
    SaveFailed {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A segment store invariant would have been violated.
    #[error("Segment store error: {reason} {location}")]
    SegmentStore {
        /// Which invariant was violated.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No export job exists with the given id.
    #[error("Export job not found: {job_id} {location}")]
    JobNotFound {
        /// The id that was looked up.
        job_id: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A background task has shut down and can no longer accept commands.
    #[error("Channel closed: {message} {location}")]
    ChannelClosed {
        /// Which channel was closed.
        message: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl CoreError {
    /// Message suitable for showing next to a failed export job.
    ///
    /// Drops the source location so the text stays readable in a job list.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::StitchFailed { reason, .. } => format!("Stitching failed: {}", reason),
            CoreError::SaveFailed { reason, .. } => format!("Save failed: {}", reason),
            CoreError::SegmentStore { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
