//! LevelCam Core Library
//!
//! Orientation-driven segmented capture: attitude samples are debounced into
//! orientation classes, the recorder rolls over into a new segment whenever
//! the class changes, and finished sessions are stitched and saved by a
//! retryable background export queue.
//!
//! Video encoding, camera hardware and the media library stay with the host,
//! behind the traits in [`collaborators`].
//!
//! # Example
//!
//! ```no_run
//! use levelcam_core::{
//!     CameraConfigurator, CaptureConfiguration, ClassifierConfig, CoreResult, ExportConfig,
//!     ExportQueue, LibrarySaver, MonotonicClock, OrientationMonitor, RecordingController,
//!     SegmentWriter, Stitcher,
//! };
//!
//! use std::sync::Arc;
//!
//! use tokio::sync::mpsc;
//!
//! async fn record(
//!     writer: Arc<dyn SegmentWriter>,
//!     camera: Arc<dyn CameraConfigurator>,
//!     stitcher: Arc<dyn Stitcher>,
//!     saver: Arc<dyn LibrarySaver>,
//! ) -> CoreResult<()> {
//!     let (sample_tx, sample_rx) = mpsc::channel(64);
//!     let (_monitor, changes) = OrientationMonitor::spawn(ClassifierConfig::default(), sample_rx);
//!
//!     let exports = ExportQueue::spawn(ExportConfig::default(), stitcher, saver);
//!     let recorder = RecordingController::new(
//!         writer,
//!         camera,
//!         exports.clone(),
//!         Arc::new(MonotonicClock::new()),
//!         CaptureConfiguration::default(),
//!     )
//!     .spawn(changes);
//!
//!     recorder.start().await?;
//!     // ... feed attitude samples into `sample_tx` ...
//!     # drop(sample_tx);
//!     if let Some(outcome) = recorder.stop().await? {
//!         println!("Export job {} queued", outcome.job_id);
//!     }
//!     Ok(())
//! }
//! ```

mod capture_config;
mod clock;
pub mod collaborators;
mod error;
mod export;
mod orientation;
mod recorder;
mod segment;

pub use {
    capture_config::{CaptureConfiguration, Lens, Resolution},
    clock::{Clock, ManualClock, MonotonicClock},
    collaborators::{
        CameraConfigurator, LibrarySaver, SegmentFile, SegmentHandle, SegmentRequest,
        SegmentWriter, Stitcher,
    },
    error::{BoxError, CoreError, Result as CoreResult},
    export::{
        DEFAULT_WORKER_COUNT, ExportConfig, ExportJob, ExportQueue, ExportState, JobId,
        ProgressReporter,
    },
    orientation::{
        Attitude, ClassifierConfig, DEFAULT_DWELL, DEFAULT_FLAT_THRESHOLD,
        DEFAULT_LANDSCAPE_THRESHOLD, MonitorStatus, OrientationChange, OrientationClassifier,
        OrientationMonitor, OrientationSample, OrientationState,
    },
    recorder::{
        ConfigChangeOutcome, ConfigurationGate, RecorderHandle, RecorderPhase, RecorderStatus,
        RecordingController, RecordingEvent, RolloverReason, StopOutcome,
    },
    segment::{RecordingSession, SealedSession, Segment, SegmentStore, SessionId},
};

#[cfg(test)]
mod tests;
