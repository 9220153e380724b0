use crate::{
    AppError, AppResult, FileSegmentWriter, FileStitcher, LibraryFolder, LoggingCamera,
    config::Config,
    trace::Trace,
};

use levelcam_core::{
    ConfigChangeOutcome, CoreError, ExportJob, ExportQueue, ExportState, ManualClock,
    OrientationMonitor, RecordingController, RecordingEvent, SealedSession,
};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

/// Capacity of the attitude sample channel.
const SAMPLE_CHANNEL_CAPACITY: usize = 256;

/// Stitched clips are assembled here, below the segment directory.
const STITCH_SUBDIR: &str = "stitched";

/// What one replayed take produced.
#[derive(Debug)]
pub struct TakeSummary {
    /// The sealed session, unless recording was aborted.
    pub session: Option<Arc<SealedSession>>,
    /// Export jobs once every one of them has settled.
    pub jobs: Vec<ExportJob>,
}

/// Replays a recorded attitude trace through the capture pipeline.
///
/// Time follows the trace: a [`ManualClock`] is moved to each sample's
/// timestamp before the sample is delivered, so seams land exactly where
/// the trace says the device settled.
pub struct App {
    pub(crate) config: Config,
    pub(crate) trace: Trace,
    pub(crate) max_retries: u32,
}

impl App {
    /// Records one take and waits for its exports.
    #[instrument(skip(self))]
    pub(crate) async fn run(self) -> AppResult<TakeSummary> {
        info!("LevelCam starting");

        let storage = &self.config.storage;
        let writer = Arc::new(FileSegmentWriter::new(storage.segment_dir.clone()));
        let camera = Arc::new(LoggingCamera::new());
        let stitcher = Arc::new(FileStitcher::new(storage.segment_dir.join(STITCH_SUBDIR)));
        let saver = Arc::new(LibraryFolder::new(storage.library_dir.clone()));
        let clock = ManualClock::new();

        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let (monitor, changes) =
            OrientationMonitor::spawn(self.config.orientation.classifier(), sample_rx);

        let exports = ExportQueue::spawn(self.config.export.queue_config(), stitcher, saver);
        let recorder = RecordingController::new(
            writer,
            Arc::clone(&camera) as _,
            exports.clone(),
            Arc::new(clock.clone()),
            self.config.capture,
        )
        .spawn(changes);

        let event_log = tokio::spawn(log_events(recorder.subscribe()));

        recorder.start().await?;

        let mut monitor_status = monitor.watch_status();
        let mut last_sent = None;

        for step in self.trace.steps() {
            clock.set(step.sample.timestamp);

            if let Some(configuration) = step.capture {
                // Seams committed by earlier samples must reach the recorder
                // before this request does.
                monitor_status
                    .wait_for(|s| s.last_sample_at >= last_sent)
                    .await
                    .map_err(|e| channel_closed(format!("Orientation monitor stopped: {}", e)))?;

                match recorder.request_configuration_change(configuration).await? {
                    ConfigChangeOutcome::Applied(applied) => {
                        info!(configuration = %applied, "Capture configuration switched")
                    }
                    ConfigChangeOutcome::Rejected { current } => {
                        warn!(current = %current, "Capture configuration change rejected")
                    }
                    ConfigChangeOutcome::Superseded => {
                        debug!("Capture configuration change superseded")
                    }
                }
            }

            sample_tx
                .send(step.sample)
                .await
                .map_err(|e| channel_closed(format!("Orientation monitor stopped: {}", e)))?;
            last_sent = Some(step.sample.timestamp);
        }

        drop(sample_tx);

        // The monitor reports the end of the trace as an unavailable sensor.
        match monitor.join().await {
            Ok(()) | Err(CoreError::SensorUnavailable { .. }) => {
                debug!("Trace fully classified")
            }
            Err(e) => return Err(e.into()),
        }

        clock.set(self.trace.duration());
        let session = recorder.stop().await?.map(|outcome| outcome.session);

        let jobs = settle_exports(&exports, self.max_retries).await?;

        drop(recorder);
        if let Err(e) = event_log.await {
            error!(error = ?e, "Event logger task failed");
        }

        info!(
            camera = ?camera.active().map(|c| c.to_string()),
            "LevelCam finished"
        );

        Ok(TakeSummary { session, jobs })
    }
}

/// Waits for every job to finish, retrying failures up to `max_retries` times.
async fn settle_exports(exports: &ExportQueue, max_retries: u32) -> AppResult<Vec<ExportJob>> {
    let mut retries = 0;

    loop {
        let jobs = wait_until_settled(exports).await?;

        let failed: Vec<_> = jobs
            .iter()
            .filter(|j| matches!(j.state, ExportState::Failed(_)))
            .collect();

        if failed.is_empty() || retries >= max_retries {
            return Ok(jobs);
        }

        retries += 1;
        for job in failed {
            warn!(
                job_id = %job.id,
                error = job.error_message().unwrap_or_default(),
                retry = retries,
                "Retrying failed export"
            );
            exports.retry(job.id)?;
        }
    }
}

async fn wait_until_settled(exports: &ExportQueue) -> AppResult<Vec<ExportJob>> {
    let mut jobs = exports.watch_jobs();
    let settled = jobs
        .wait_for(|jobs| jobs.iter().all(|j| j.state.is_terminal()))
        .await
        .map_err(|e| channel_closed(format!("Export queue stopped: {}", e)))?;
    Ok(settled.clone())
}

async fn log_events(mut events: broadcast::Receiver<RecordingEvent>) {
    loop {
        match events.recv().await {
            Ok(RecordingEvent::SegmentClosed {
                index, duration, ..
            }) => {
                info!(index, duration_ms = duration.as_millis(), "Segment closed")
            }
            Ok(RecordingEvent::RolledOver {
                from_index,
                to_index,
                reason,
                ..
            }) => {
                info!(from_index, to_index, reason = ?reason, "Rolled over")
            }
            Ok(RecordingEvent::Failed { message, .. }) => {
                error!(message = %message, "Recording failed")
            }
            Ok(event) => debug!(event = ?event, "Recording event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event logger lagging")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[track_caller]
fn channel_closed(message: String) -> AppError {
    AppError::from(CoreError::ChannelClosed {
        message,
        location: ErrorLocation::from(Location::caller()),
    })
}
