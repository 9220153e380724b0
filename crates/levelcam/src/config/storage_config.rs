use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where recordings live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Scratch directory for segment files and stitched clips.
    pub segment_dir: PathBuf,
    /// Directory standing in for the media library.
    pub library_dir: PathBuf,
}
