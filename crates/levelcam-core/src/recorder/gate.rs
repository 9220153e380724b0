//! Serializes camera configuration change requests.
//!
//! Requests arriving during a seam, session start or stop are rejected on
//! the spot. Accepted requests wait in a single slot for the controller; a
//! newer request replaces an older one that has not been applied yet.

use crate::{CaptureConfiguration, CoreError, CoreResult, recorder::RecorderStatus};

use std::{
    panic::Location,
    sync::{Mutex, MutexGuard},
};

use error_location::ErrorLocation;
use tokio::sync::{Notify, oneshot, watch};
use tracing::{debug, error, info, instrument};

/// Result of a configuration change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChangeOutcome {
    /// The configuration is now active.
    Applied(CaptureConfiguration),
    /// The controller was mid-transition; nothing changed.
    Rejected {
        /// Configuration that remains active.
        current: CaptureConfiguration,
    },
    /// A later request replaced this one before it was applied.
    Superseded,
}

pub(crate) struct PendingChange {
    pub(crate) configuration: CaptureConfiguration,
    pub(crate) reply: oneshot::Sender<CoreResult<ConfigChangeOutcome>>,
}

/// Last-write-wins slot between configuration requesters and the controller.
pub struct ConfigurationGate {
    pending: Mutex<Option<PendingChange>>,
    notify: Notify,
    status_rx: watch::Receiver<RecorderStatus>,
}

impl ConfigurationGate {
    pub(crate) fn new(status_rx: watch::Receiver<RecorderStatus>) -> Self {
        Self {
            pending: Mutex::new(None),
            notify: Notify::new(),
            status_rx,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingChange>> {
        self.pending.lock().unwrap_or_else(|e| {
            error!("Configuration slot lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    /// Asks the controller to switch to `configuration`.
    ///
    /// Resolves once the request was applied, rejected, or replaced by a
    /// newer one.
    ///
    /// # Errors
    ///
    /// Returns the camera's error if applying failed, or
    /// [`CoreError::ChannelClosed`] if the controller has shut down.
    #[instrument(skip(self))]
    pub async fn request_change(
        &self,
        configuration: CaptureConfiguration,
    ) -> CoreResult<ConfigChangeOutcome> {
        let status = *self.status_rx.borrow();

        if !status.phase.accepts_configuration_change() {
            info!(phase = ?status.phase, "Configuration change rejected during transition");
            return Ok(ConfigChangeOutcome::Rejected {
                current: status.configuration,
            });
        }

        let (reply, reply_rx) = oneshot::channel();

        let replaced = self.slot().replace(PendingChange {
            configuration,
            reply,
        });
        if let Some(previous) = replaced {
            debug!(previous = %previous.configuration, "Pending configuration superseded");
            let _ = previous.reply.send(Ok(ConfigChangeOutcome::Superseded));
        }

        self.notify.notify_one();

        reply_rx.await.map_err(|e| CoreError::ChannelClosed {
            message: format!("Recorder dropped configuration request: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?
    }

    /// Removes the pending request, if any.
    pub(crate) fn take(&self) -> Option<PendingChange> {
        self.slot().take()
    }

    /// Resolves when a request has been placed in the slot.
    pub(crate) async fn notified(&self) {
        self.notify.notified().await;
    }
}
