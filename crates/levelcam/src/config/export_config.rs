use crate::config::{default_filename_prefix, default_stitch_segments, default_worker_count};

use levelcam_core::ExportConfig;
use serde::{Deserialize, Serialize};

/// Extension of every artifact the host writes.
const ARTIFACT_EXTENSION: &str = "mov";

/// Export queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Join multi-segment takes into a single clip.
    #[serde(default = "default_stitch_segments")]
    pub stitch_segments: bool,
    /// How many exports may run at once.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Prefix of saved clip names.
    #[serde(default = "default_filename_prefix")]
    pub filename_prefix: String,
}

impl ExportSettings {
    /// Queue configuration for the core.
    pub fn queue_config(&self) -> ExportConfig {
        ExportConfig {
            stitch_segments: self.stitch_segments,
            worker_count: self.worker_count,
            filename_prefix: self.filename_prefix.clone(),
            extension: ARTIFACT_EXTENSION.to_string(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            stitch_segments: default_stitch_segments(),
            worker_count: default_worker_count(),
            filename_prefix: default_filename_prefix(),
        }
    }
}
