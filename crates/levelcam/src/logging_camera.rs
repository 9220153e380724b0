use levelcam_core::{BoxError, CameraConfigurator, CaptureConfiguration};

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{error, info};

/// Camera stand-in that records the active configuration and logs changes.
#[derive(Default)]
pub struct LoggingCamera {
    active: Mutex<Option<CaptureConfiguration>>,
}

impl LoggingCamera {
    /// Camera with nothing applied yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration most recently applied.
    pub fn active(&self) -> Option<CaptureConfiguration> {
        *self.active.lock().unwrap_or_else(|e| {
            error!("Camera state lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}

#[async_trait]
impl CameraConfigurator for LoggingCamera {
    async fn apply_configuration(
        &self,
        configuration: &CaptureConfiguration,
    ) -> Result<(), BoxError> {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(*configuration);

        info!(
            previous = ?previous.map(|c| c.to_string()),
            configuration = %configuration,
            "Camera configured"
        );

        Ok(())
    }
}
