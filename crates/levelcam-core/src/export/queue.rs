//! Background export queue.
//!
//! Sealed sessions are submitted once and become export jobs. A dispatcher
//! task starts jobs in FIFO order, never running more than the configured
//! number at once, so exports stay off the recording path. Failed jobs stay
//! listed until they are retried successfully or dismissed.

use crate::{
    CoreError, CoreResult, LibrarySaver, SealedSession, Stitcher,
    export::{
        ExportJob, ExportState, JobId, ProgressReporter,
        pipeline::Pipeline,
        table::JobTable,
    },
};

use std::{panic::Location, sync::Arc};

use chrono::{Local, Utc};
use error_location::ErrorLocation;
use tokio::sync::{Semaphore, mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

/// Default number of jobs allowed to run at once.
pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Export queue settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Concatenate multi-segment sessions into one artifact.
    pub stitch_segments: bool,
    /// Maximum concurrently running jobs; values below 1 are treated as 1.
    pub worker_count: usize,
    /// Prefix for generated artifact names.
    pub filename_prefix: String,
    /// Extension for generated artifact names.
    pub extension: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            stitch_segments: true,
            worker_count: DEFAULT_WORKER_COUNT,
            filename_prefix: "LevelCam".to_string(),
            extension: "mov".to_string(),
        }
    }
}

/// Handle to the export queue. Cheap to clone.
#[derive(Clone)]
pub struct ExportQueue {
    table: Arc<JobTable>,
    dispatch_tx: mpsc::UnboundedSender<JobId>,
    config: Arc<ExportConfig>,
}

impl ExportQueue {
    /// Starts the dispatcher on the current tokio runtime.
    #[instrument(skip(stitcher, saver))]
    pub fn spawn(
        config: ExportConfig,
        stitcher: Arc<dyn Stitcher>,
        saver: Arc<dyn LibrarySaver>,
    ) -> Self {
        let table = Arc::new(JobTable::new());
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let workers = config.worker_count.max(1);

        let pipeline = Arc::new(Pipeline {
            stitcher,
            saver,
            stitch_segments: config.stitch_segments,
        });

        tokio::spawn(dispatch(
            dispatch_rx,
            Arc::clone(&table),
            pipeline,
            Arc::new(Semaphore::new(workers)),
        ));

        info!(
            workers,
            stitch = config.stitch_segments,
            "Export queue started"
        );

        Self {
            table,
            dispatch_tx,
            config: Arc::new(config),
        }
    }

    /// Queues a sealed session for export.
    ///
    /// Submitting a session that already has a listed job returns that
    /// job's id without queueing any new work.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ChannelClosed`] if the dispatcher has stopped.
    #[track_caller]
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn submit(&self, session: Arc<SealedSession>) -> CoreResult<JobId> {
        if let Some(existing) = self.table.job_for_session(session.id) {
            debug!(job_id = %existing, "Session already submitted");
            return Ok(existing);
        }

        let created_at = Utc::now();
        let filename = format!(
            "{}_{}_{}.{}",
            self.config.filename_prefix,
            created_at.with_timezone(&Local).format("%Y%m%d_%H%M%S"),
            short_id(&session.id.to_string()),
            self.config.extension
        );

        let job = ExportJob {
            id: JobId::new(),
            session_id: session.id,
            filename,
            created_at,
            progress: 0.0,
            state: ExportState::Pending,
            attempts: 0,
        };

        let (job_id, inserted) = self.table.insert(job, session);
        if !inserted {
            return Ok(job_id);
        }

        self.enqueue(job_id)?;

        info!(job_id = %job_id, "Export job queued");
        Ok(job_id)
    }

    /// Re-queues a failed job at the back of the queue.
    ///
    /// Returns `false` without doing anything unless the job is `Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::JobNotFound`] for an unknown id.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn retry(&self, job_id: JobId) -> CoreResult<bool> {
        let rearmed = self
            .table
            .rearm(job_id)
            .ok_or_else(|| job_not_found(job_id))?;

        if !rearmed {
            debug!(job_id = %job_id, "Retry ignored, job has not failed");
            return Ok(false);
        }

        self.enqueue(job_id)?;

        info!(job_id = %job_id, "Export job re-queued");
        Ok(true)
    }

    /// Removes a completed or failed job from the list.
    ///
    /// Returns `false` for jobs that are still pending or running.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::JobNotFound`] for an unknown id.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn dismiss(&self, job_id: JobId) -> CoreResult<bool> {
        let removed = self
            .table
            .remove_terminal(job_id)
            .ok_or_else(|| job_not_found(job_id))?;

        if removed {
            info!(job_id = %job_id, "Export job dismissed");
        }
        Ok(removed)
    }

    /// Current progress of a job, without waiting on any worker.
    pub fn progress(&self, job_id: JobId) -> Option<f64> {
        self.table.get(job_id).map(|j| j.progress)
    }

    /// Snapshot of one job.
    pub fn job(&self, job_id: JobId) -> Option<ExportJob> {
        self.table.get(job_id)
    }

    /// Snapshot of all listed jobs in submission order.
    pub fn jobs(&self) -> Vec<ExportJob> {
        self.table.snapshot()
    }

    /// Receiver notified whenever any job changes.
    pub fn watch_jobs(&self) -> watch::Receiver<Vec<ExportJob>> {
        self.table.subscribe()
    }

    /// Whether any job is waiting or running.
    pub fn is_saving(&self) -> bool {
        self.table
            .snapshot()
            .iter()
            .any(|j| matches!(j.state, ExportState::Pending | ExportState::Running))
    }

    #[track_caller]
    fn enqueue(&self, job_id: JobId) -> CoreResult<()> {
        self.dispatch_tx
            .send(job_id)
            .map_err(|e| CoreError::ChannelClosed {
                message: format!("Export dispatcher stopped: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

async fn dispatch(
    mut dispatch_rx: mpsc::UnboundedReceiver<JobId>,
    table: Arc<JobTable>,
    pipeline: Arc<Pipeline>,
    workers: Arc<Semaphore>,
) {
    while let Some(job_id) = dispatch_rx.recv().await {
        // Wait for a free worker before taking the next id, so jobs start in
        // submission order.
        let permit = match Arc::clone(&workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = ?e, "Export worker pool closed");
                break;
            }
        };

        let table = Arc::clone(&table);
        let pipeline = Arc::clone(&pipeline);

        tokio::spawn(async move {
            run_job(job_id, &table, &pipeline).await;
            drop(permit);
        });
    }

    debug!("Export dispatcher stopped");
}

async fn run_job(job_id: JobId, table: &Arc<JobTable>, pipeline: &Pipeline) {
    let Some(session) = table.begin(job_id) else {
        warn!(job_id = %job_id, "Job no longer pending, skipping");
        return;
    };

    let Some(job) = table.get(job_id) else {
        return;
    };

    info!(job_id = %job_id, attempt = job.attempts, filename = %job.filename, "Export started");

    let progress = ProgressReporter::new(job_id, Arc::clone(table), 0.0, 1.0);
    let start = std::time::Instant::now();

    match pipeline.run(&job, &session, &progress).await {
        Ok(()) => {
            table.complete(job_id);
            info!(
                job_id = %job_id,
                duration_ms = start.elapsed().as_millis(),
                "Export completed"
            );
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Export failed");
            table.fail(job_id, e.user_message());
        }
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[track_caller]
fn job_not_found(job_id: JobId) -> CoreError {
    CoreError::JobNotFound {
        job_id: job_id.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
