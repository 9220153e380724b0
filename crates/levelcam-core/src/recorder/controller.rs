//! Recording state machine.
//!
//! One task owns every session and segment mutation. It reacts to host
//! commands, committed orientation changes and configuration requests, one
//! at a time, so a seam always finishes closing the old segment before the
//! new one is opened.

use crate::{
    CameraConfigurator, CaptureConfiguration, Clock, CoreError, CoreResult, ExportQueue, JobId,
    OrientationChange, OrientationState, RecordingSession, SealedSession, Segment, SegmentHandle,
    SegmentRequest, SegmentWriter, SessionId,
    recorder::{
        ConfigChangeOutcome, ConfigurationGate, RecorderHandle, RecorderPhase, RecorderStatus,
        RecordingEvent, RolloverReason,
    },
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

/// Capacity of the recorder command channel.
pub const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Capacity of the recording event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// What a successful stop hands back to the caller.
#[derive(Debug, Clone)]
pub struct StopOutcome {
    /// The sealed session.
    pub session: Arc<SealedSession>,
    /// Export job created for it.
    pub job_id: JobId,
}

pub(crate) enum RecorderCommand {
    Start {
        reply: oneshot::Sender<CoreResult<Option<SessionId>>>,
    },
    Stop {
        reply: oneshot::Sender<CoreResult<Option<StopOutcome>>>,
    },
}

struct ActiveSession {
    session: RecordingSession,
    /// The segment currently being written; `None` only mid-seam.
    handle: Option<SegmentHandle>,
}

/// Owns the recording session lifecycle.
///
/// Build with [`RecordingController::new`] and move it onto its own task with
/// [`RecordingController::spawn`]; afterwards talk to it through the returned
/// [`RecorderHandle`].
pub struct RecordingController {
    writer: Arc<dyn SegmentWriter>,
    camera: Arc<dyn CameraConfigurator>,
    clock: Arc<dyn Clock>,
    exports: ExportQueue,
    gate: Arc<ConfigurationGate>,
    status_tx: watch::Sender<RecorderStatus>,
    event_tx: broadcast::Sender<RecordingEvent>,
    active: Option<ActiveSession>,
    phase: RecorderPhase,
    configuration: CaptureConfiguration,
    /// Latest committed orientation, ambiguous or not.
    orientation: OrientationState,
    /// Orientation new segments are recorded under.
    recording_orientation: OrientationState,
}

impl RecordingController {
    /// Creates an idle controller.
    pub fn new(
        writer: Arc<dyn SegmentWriter>,
        camera: Arc<dyn CameraConfigurator>,
        exports: ExportQueue,
        clock: Arc<dyn Clock>,
        configuration: CaptureConfiguration,
    ) -> Self {
        let status = RecorderStatus {
            phase: RecorderPhase::Idle,
            orientation: OrientationState::Unknown,
            configuration,
        };
        let (status_tx, status_rx) = watch::channel(status);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            writer,
            camera,
            clock,
            exports,
            gate: Arc::new(ConfigurationGate::new(status_rx)),
            status_tx,
            event_tx,
            active: None,
            phase: RecorderPhase::Idle,
            configuration,
            orientation: OrientationState::Unknown,
            recording_orientation: OrientationState::Portrait,
        }
    }

    /// Seeds the orientation known before any change event arrives.
    pub fn with_orientation(mut self, orientation: OrientationState) -> Self {
        self.orientation = orientation;
        if !orientation.is_ambiguous() {
            self.recording_orientation = orientation;
        }
        self.publish();
        self
    }

    /// Moves the controller onto its own task.
    ///
    /// `orientation_events` is the stream of committed changes, usually from
    /// an [`OrientationMonitor`](crate::OrientationMonitor). If it ends, the
    /// controller keeps running without orientation rollovers.
    pub fn spawn(self, orientation_events: mpsc::Receiver<OrientationChange>) -> RecorderHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = RecorderHandle {
            command_tx,
            gate: Arc::clone(&self.gate),
            status_rx: self.status_tx.subscribe(),
            event_tx: self.event_tx.clone(),
            exports: self.exports.clone(),
        };

        tokio::spawn(self.run(command_rx, orientation_events));

        handle
    }

    #[instrument(skip_all)]
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<RecorderCommand>,
        mut orientation_events: mpsc::Receiver<OrientationChange>,
    ) {
        info!(configuration = %self.configuration, "Recording controller started");

        let gate = Arc::clone(&self.gate);
        let mut orientation_open = true;

        loop {
            // Committed changes are drained before commands, so a stop never
            // drops a seam that was already decided.
            tokio::select! {
                biased;

                change = orientation_events.recv(), if orientation_open => {
                    match change {
                        Some(change) => self.handle_orientation(change).await,
                        None => {
                            warn!("Orientation events ended, continuing without rollovers");
                            orientation_open = false;
                        }
                    }
                }

                command = commands.recv() => {
                    let Some(command) = command else {
                        info!("All recorder handles dropped");
                        break;
                    };
                    self.handle_command(command).await;
                }

                () = gate.notified() => self.handle_configuration_request().await,
            }
        }

        if self.active.is_some() {
            if let Err(e) = self.stop().await {
                error!(error = %e, "Failed to stop recording during shutdown");
            }
        }

        info!("Recording controller stopped");
    }

    async fn handle_command(&mut self, command: RecorderCommand) {
        match command {
            RecorderCommand::Start { reply } => {
                let result = self.start().await;
                let _ = reply.send(result);
            }
            RecorderCommand::Stop { reply } => {
                let result = self.stop().await;
                let _ = reply.send(result);
            }
        }
    }

    fn set_phase(&mut self, phase: RecorderPhase) {
        self.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        self.status_tx.send_replace(RecorderStatus {
            phase: self.phase,
            orientation: self.orientation,
            configuration: self.configuration,
        });
    }

    fn emit(&self, event: RecordingEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    fn recording_phase(&self) -> RecorderPhase {
        match &self.active {
            Some(active) => RecorderPhase::Recording {
                session_id: active.session.id,
                segment_index: active.session.segments.len().saturating_sub(1),
                orientation: self.recording_orientation,
            },
            None => RecorderPhase::Idle,
        }
    }

    #[instrument(skip(self))]
    async fn start(&mut self) -> CoreResult<Option<SessionId>> {
        if self.phase != RecorderPhase::Idle {
            debug!(phase = ?self.phase, "Start ignored, not idle");
            return Ok(None);
        }

        let session = RecordingSession::new(self.configuration, self.clock.now());
        let session_id = session.id;

        self.active = Some(ActiveSession {
            session,
            handle: None,
        });
        self.set_phase(RecorderPhase::Configuring { session_id });

        let configuration = self.configuration;
        if let Err(source) = self.camera.apply_configuration(&configuration).await {
            return Err(self.abort(CoreError::ConfigurationFailed {
                source,
                location: ErrorLocation::from(Location::caller()),
            }));
        }

        let at = self.clock.now();
        if let Err(e) = self.open_segment(at).await {
            return Err(self.abort(e));
        }

        self.set_phase(self.recording_phase());
        self.emit(RecordingEvent::Started { session_id });

        info!(
            session_id = %session_id,
            orientation = %self.recording_orientation,
            "Recording started"
        );

        Ok(Some(session_id))
    }

    #[instrument(skip(self))]
    async fn stop(&mut self) -> CoreResult<Option<StopOutcome>> {
        let Some(session_id) = self.phase.session_id().filter(|_| self.phase.is_recording())
        else {
            debug!(phase = ?self.phase, "Stop ignored, not recording");
            return Ok(None);
        };

        self.set_phase(RecorderPhase::Stopping { session_id });

        let at = self.clock.now();
        if let Err(e) = self.close_segment(at).await {
            return Err(self.abort(e));
        }

        let Some(active) = self.active.take() else {
            self.set_phase(RecorderPhase::Idle);
            return Ok(None);
        };

        let sealed = match active.session.seal(at) {
            Ok(sealed) => Arc::new(sealed),
            Err(e) => return Err(self.abort(e)),
        };

        let job_id = match self.exports.submit(Arc::clone(&sealed)) {
            Ok(job_id) => job_id,
            Err(e) => return Err(self.abort(e)),
        };

        self.set_phase(RecorderPhase::Idle);
        self.emit(RecordingEvent::Stopped {
            session_id,
            job_id,
            segment_count: sealed.segments.len(),
        });

        info!(
            session_id = %session_id,
            job_id = %job_id,
            segment_count = sealed.segments.len(),
            duration_ms = sealed.duration().as_millis(),
            "Recording stopped"
        );

        Ok(Some(StopOutcome {
            session: sealed,
            job_id,
        }))
    }

    #[instrument(skip(self), fields(to = %change.to))]
    async fn handle_orientation(&mut self, change: OrientationChange) {
        self.orientation = change.to;

        if change.to.is_ambiguous() {
            debug!("Ambiguous orientation, no rollover");
            self.publish();
            return;
        }

        if self.active.is_none() {
            self.recording_orientation = change.to;
            self.publish();
            return;
        }

        if change.to == self.recording_orientation {
            debug!("Back to the recording orientation, no rollover");
            self.publish();
            return;
        }

        let mut at = change.at;

        // A change committed at or before the open segment's start arrived
        // after a configuration seam that was cut later on the timeline.
        let open_since = self
            .active
            .as_ref()
            .and_then(|a| a.session.segments.current())
            .map(|s| s.started_at)
            .filter(|started_at| change.at <= *started_at);

        if let Some(started_at) = open_since {
            let now = self.clock.now();
            if now <= started_at {
                self.relabel_open_segment(change.to);
                return;
            }
            debug!(
                committed_ms = change.at.as_millis(),
                now_ms = now.as_millis(),
                "Late orientation change, seam moved to now"
            );
            at = now;
        }

        let configuration = self.configuration;
        let reason = RolloverReason::Orientation(change.to);
        if let Err(e) = self.roll_over(at, change.to, configuration, reason).await {
            error!(error = %e, "Orientation rollover failed");
        }
    }

    /// Records `orientation` for an open segment that has no footage yet.
    fn relabel_open_segment(&mut self, orientation: OrientationState) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let session_id = active.session.id;

        let index = match active.session.segments.relabel_current(orientation) {
            Ok(segment) => segment.index,
            Err(e) => {
                warn!(error = %e, "Failed to relabel open segment");
                return;
            }
        };

        self.recording_orientation = orientation;
        self.set_phase(self.recording_phase());
        self.emit(RecordingEvent::SegmentRelabelled {
            session_id,
            index,
            orientation,
        });

        info!(
            session_id = %session_id,
            index,
            orientation = %orientation,
            "Open segment relabelled"
        );
    }

    async fn handle_configuration_request(&mut self) {
        let Some(pending) = self.gate.take() else {
            return;
        };

        let result = self.apply_configuration(pending.configuration).await;
        let _ = pending.reply.send(result);
    }

    #[instrument(skip(self, configuration), fields(configuration = %configuration))]
    async fn apply_configuration(
        &mut self,
        configuration: CaptureConfiguration,
    ) -> CoreResult<ConfigChangeOutcome> {
        if !self.phase.accepts_configuration_change() {
            return Ok(ConfigChangeOutcome::Rejected {
                current: self.configuration,
            });
        }

        if configuration == self.configuration {
            debug!("Configuration unchanged");
            return Ok(ConfigChangeOutcome::Applied(configuration));
        }

        if self.active.is_some() {
            let at = self.clock.now();
            let orientation = self.recording_orientation;
            self.roll_over(at, orientation, configuration, RolloverReason::Configuration)
                .await?;
        } else {
            self.camera
                .apply_configuration(&configuration)
                .await
                .map_err(|source| CoreError::ConfigurationFailed {
                    source,
                    location: ErrorLocation::from(Location::caller()),
                })?;
            self.configuration = configuration;
            self.publish();
            self.emit(RecordingEvent::ConfigurationApplied(configuration));
        }

        info!("Configuration applied");
        Ok(ConfigChangeOutcome::Applied(configuration))
    }

    /// Closes the open segment at `at` and opens the next one at the same
    /// instant, under `orientation` and `configuration`.
    #[instrument(skip(self, configuration))]
    async fn roll_over(
        &mut self,
        at: Duration,
        orientation: OrientationState,
        configuration: CaptureConfiguration,
        reason: RolloverReason,
    ) -> CoreResult<()> {
        let Some(session_id) = self.phase.session_id() else {
            return Ok(());
        };
        let from_index = match &self.active {
            Some(active) => active.session.segments.len().saturating_sub(1),
            None => return Ok(()),
        };

        self.set_phase(RecorderPhase::RollingOver {
            session_id,
            from_index,
        });

        if let Err(e) = self.close_segment(at).await {
            return Err(self.abort(e));
        }

        if configuration != self.configuration {
            if let Err(source) = self.camera.apply_configuration(&configuration).await {
                return Err(self.abort(CoreError::ConfigurationFailed {
                    source,
                    location: ErrorLocation::from(Location::caller()),
                }));
            }
            self.configuration = configuration;
            self.emit(RecordingEvent::ConfigurationApplied(configuration));
        }
        self.recording_orientation = orientation;

        // The previous segment's end, so the seam has neither gap nor overlap.
        let seam = self
            .active
            .as_ref()
            .and_then(|a| a.session.segments.last())
            .and_then(|s| s.ended_at)
            .unwrap_or(at);

        if let Err(e) = self.open_segment(seam).await {
            return Err(self.abort(e));
        }

        self.set_phase(self.recording_phase());
        self.emit(RecordingEvent::RolledOver {
            session_id,
            from_index,
            to_index: from_index + 1,
            reason,
        });

        info!(
            session_id = %session_id,
            from_index,
            orientation = %orientation,
            "Rolled over to a new segment"
        );

        Ok(())
    }

    async fn open_segment(&mut self, at: Duration) -> CoreResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };

        let request = SegmentRequest {
            session_id: active.session.id,
            index: active.session.segments.len(),
            orientation: self.recording_orientation,
            configuration: self.configuration,
        };

        let handle = self
            .writer
            .open_segment(request)
            .await
            .map_err(|source| CoreError::SegmentOpenFailed {
                index: request.index,
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let segment = Segment {
            index: request.index,
            orientation: request.orientation,
            configuration: request.configuration,
            file: handle.path.clone(),
            started_at: at,
            ended_at: None,
            size_bytes: None,
        };

        if let Err(e) = active.session.segments.append(segment) {
            if let Err(close_err) = self.writer.close_segment(handle).await {
                warn!(error = %close_err, "Failed to discard rejected segment");
            }
            return Err(e);
        }

        active.handle = Some(handle);

        self.emit(RecordingEvent::SegmentOpened {
            session_id: request.session_id,
            index: request.index,
            orientation: request.orientation,
        });

        Ok(())
    }

    async fn close_segment(&mut self, at: Duration) -> CoreResult<()> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let Some(handle) = active.handle.take() else {
            return Ok(());
        };
        let index = handle.index;

        let file = self
            .writer
            .close_segment(handle)
            .await
            .map_err(|source| CoreError::SegmentCloseFailed {
                index,
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let segment = active.session.segments.close_current(at, file)?;
        let duration = segment.duration().unwrap_or_default();
        let session_id = active.session.id;

        self.emit(RecordingEvent::SegmentClosed {
            session_id,
            index,
            duration,
        });

        Ok(())
    }

    /// Drops the open session, returns to idle and reports `error`.
    fn abort(&mut self, error: CoreError) -> CoreError {
        let session_id = self.active.take().map(|a| a.session.id);

        self.set_phase(RecorderPhase::Idle);
        self.emit(RecordingEvent::Failed {
            session_id,
            message: error.to_string(),
        });

        error!(session_id = ?session_id.map(|id| id.to_string()), error = %error, "Recording aborted");

        error
    }
}
