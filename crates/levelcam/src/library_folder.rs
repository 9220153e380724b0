use levelcam_core::{BoxError, LibrarySaver};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, instrument};

/// Media library backed by a plain directory.
pub struct LibraryFolder {
    root: PathBuf,
}

impl LibraryFolder {
    /// Library stored in `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl LibrarySaver for LibraryFolder {
    #[instrument(skip(self))]
    async fn save(&self, artifact: &Path, filename: &str) -> Result<(), BoxError> {
        fs::create_dir_all(&self.root).await?;

        // Replaces a copy left by an earlier, partially failed attempt.
        let destination = self.root.join(filename);
        let bytes = fs::copy(artifact, &destination).await?;

        info!(destination = ?destination, bytes, "Clip saved to library");
        Ok(())
    }
}
