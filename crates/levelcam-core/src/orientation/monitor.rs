//! Async producer that turns a sample stream into orientation changes.
//!
//! The classifier runs on its own task so the recorder never polls the
//! sensor. The event stream is infinite while samples keep arriving and
//! cannot be restarted once the sample source closes.

use crate::{
    ClassifierConfig, CoreError, CoreResult, OrientationChange, OrientationClassifier,
    OrientationSample, OrientationState,
};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info, instrument, warn};

/// Capacity of the orientation change channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Latest classifier state, published after every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStatus {
    /// Committed orientation.
    pub orientation: OrientationState,
    /// Whether the last sample carried attitude.
    pub sensor_available: bool,
    /// Active orientation lock.
    pub lock: Option<OrientationState>,
    /// Timestamp of the last sample classified, `None` before the first.
    pub last_sample_at: Option<Duration>,
}

/// Handle to a running orientation classifier task.
pub struct OrientationMonitor {
    lock_tx: watch::Sender<Option<OrientationState>>,
    status_rx: watch::Receiver<MonitorStatus>,
    task: JoinHandle<CoreResult<()>>,
}

impl OrientationMonitor {
    /// Spawns the classifier task on the current tokio runtime.
    ///
    /// Returns the monitor and the receiving end of the change stream.
    #[instrument(skip(samples))]
    pub fn spawn(
        config: ClassifierConfig,
        samples: mpsc::Receiver<OrientationSample>,
    ) -> (Self, mpsc::Receiver<OrientationChange>) {
        let classifier = OrientationClassifier::new(config);
        let (lock_tx, lock_rx) = watch::channel(config.lock);
        let (status_tx, status_rx) = watch::channel(MonitorStatus {
            orientation: classifier.current(),
            sensor_available: classifier.sensor_available(),
            lock: classifier.lock(),
            last_sample_at: None,
        });
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task = tokio::spawn(run(classifier, samples, lock_rx, status_tx, event_tx));

        info!(dwell_ms = config.dwell.as_millis(), "Orientation monitor started");

        (
            Self {
                lock_tx,
                status_rx,
                task,
            },
            event_rx,
        )
    }

    /// Engages (`Some`) or releases (`None`) the orientation lock.
    pub fn set_lock(&self, lock: Option<OrientationState>) {
        // Fails only if the task has already finished; nothing to lock then.
        let _ = self.lock_tx.send(lock);
    }

    /// Committed orientation.
    pub fn current(&self) -> OrientationState {
        self.status_rx.borrow().orientation
    }

    /// Latest published classifier state.
    pub fn status(&self) -> MonitorStatus {
        *self.status_rx.borrow()
    }

    /// Receiver that observes every status update.
    pub fn watch_status(&self) -> watch::Receiver<MonitorStatus> {
        self.status_rx.clone()
    }

    /// Waits for the classifier task to end.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SensorUnavailable`] when the task ended because
    /// the sample source closed.
    pub async fn join(self) -> CoreResult<()> {
        drop(self.lock_tx);
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(CoreError::ChannelClosed {
                message: format!("Orientation task failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

async fn run(
    mut classifier: OrientationClassifier,
    mut samples: mpsc::Receiver<OrientationSample>,
    mut lock_rx: watch::Receiver<Option<OrientationState>>,
    status_tx: watch::Sender<MonitorStatus>,
    event_tx: mpsc::Sender<OrientationChange>,
) -> CoreResult<()> {
    let mut lock_open = true;
    let mut last_sample_at = None;

    loop {
        let change = tokio::select! {
            biased;

            changed = lock_rx.changed(), if lock_open => {
                if changed.is_err() {
                    lock_open = false;
                    continue;
                }
                let lock = *lock_rx.borrow_and_update();
                info!(lock = ?lock, "Orientation lock updated");
                classifier.set_lock(lock)
            }

            sample = samples.recv() => {
                let Some(sample) = sample else {
                    warn!("Orientation sample source closed");
                    return Err(CoreError::SensorUnavailable {
                        location: ErrorLocation::from(Location::caller()),
                    });
                };

                last_sample_at = Some(sample.timestamp);
                let was_available = classifier.sensor_available();
                let change = classifier.process(sample);
                match (was_available, classifier.sensor_available()) {
                    (true, false) => warn!("Orientation sensor stopped reporting attitude"),
                    (false, true) => debug!("Orientation sensor reporting attitude"),
                    _ => {}
                }
                change
            }
        };

        if let Some(change) = change {
            if event_tx.send(change).await.is_err() {
                debug!("Orientation change receiver dropped, monitor stopping");
                return Ok(());
            }
        }

        // Published after the change is queued: a status covering a sample
        // implies every change that sample committed has been delivered.
        status_tx.send_replace(MonitorStatus {
            orientation: classifier.current(),
            sensor_available: classifier.sensor_available(),
            lock: classifier.lock(),
            last_sample_at,
        });
    }
}
