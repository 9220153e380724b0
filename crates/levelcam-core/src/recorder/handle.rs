use crate::{
    CaptureConfiguration, CoreError, CoreResult, ExportQueue, SessionId,
    recorder::{
        ConfigChangeOutcome, ConfigurationGate, RecorderStatus, RecordingEvent, StopOutcome,
        controller::RecorderCommand,
    },
};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::instrument;

/// Command and observation surface of a running [`RecordingController`].
///
/// Cheap to clone. The controller shuts down once every handle is dropped,
/// stopping and exporting any session still recording.
///
/// [`RecordingController`]: crate::RecordingController
#[derive(Clone)]
pub struct RecorderHandle {
    pub(crate) command_tx: mpsc::Sender<RecorderCommand>,
    pub(crate) gate: Arc<ConfigurationGate>,
    pub(crate) status_rx: watch::Receiver<RecorderStatus>,
    pub(crate) event_tx: broadcast::Sender<RecordingEvent>,
    pub(crate) exports: ExportQueue,
}

impl RecorderHandle {
    /// Starts a new session.
    ///
    /// Returns `None` without doing anything unless the recorder is idle.
    ///
    /// # Errors
    ///
    /// Returns the configuration or segment error that aborted the start.
    #[instrument(skip(self))]
    pub async fn start(&self) -> CoreResult<Option<SessionId>> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(RecorderCommand::Start { reply }).await?;
        reply_rx.await.map_err(|e| closed(format!("Start reply dropped: {}", e)))?
    }

    /// Stops the current session and waits until it is sealed and queued
    /// for export.
    ///
    /// Returns `None` without doing anything unless the recorder is recording.
    ///
    /// # Errors
    ///
    /// Returns the segment error that aborted the stop.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> CoreResult<Option<StopOutcome>> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(RecorderCommand::Stop { reply }).await?;
        reply_rx.await.map_err(|e| closed(format!("Stop reply dropped: {}", e)))?
    }

    /// Requests a camera configuration change.
    ///
    /// See [`ConfigurationGate::request_change`].
    ///
    /// # Errors
    ///
    /// Returns the camera error if applying failed.
    pub async fn request_configuration_change(
        &self,
        configuration: CaptureConfiguration,
    ) -> CoreResult<ConfigChangeOutcome> {
        self.gate.request_change(configuration).await
    }

    /// Latest recorder status.
    pub fn status(&self) -> RecorderStatus {
        *self.status_rx.borrow()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<RecorderStatus> {
        self.status_rx.clone()
    }

    /// Subscribes to recording events.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Whether a session is recording.
    pub fn is_recording(&self) -> bool {
        self.status().is_recording()
    }

    /// Whether a seam is being cut right now.
    pub fn is_restarting(&self) -> bool {
        self.status().is_restarting()
    }

    /// Whether any export job is pending or running.
    pub fn is_saving_video(&self) -> bool {
        self.exports.is_saving()
    }

    /// The export queue sessions are submitted to.
    pub fn exports(&self) -> &ExportQueue {
        &self.exports
    }

    async fn send(&self, command: RecorderCommand) -> CoreResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| closed("Recording controller stopped".to_string()))
    }
}

#[track_caller]
fn closed(message: String) -> CoreError {
    CoreError::ChannelClosed {
        message,
        location: ErrorLocation::from(Location::caller()),
    }
}
