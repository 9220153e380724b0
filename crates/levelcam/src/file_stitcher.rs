use levelcam_core::{BoxError, ProgressReporter, Stitcher};

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument};

/// Joins segment files byte for byte into `<root>/<output name>`.
pub struct FileStitcher {
    root: PathBuf,
}

impl FileStitcher {
    /// Stitcher writing its output under `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Stitcher for FileStitcher {
    #[instrument(skip(self, inputs, progress), fields(inputs = inputs.len()))]
    async fn concatenate(
        &self,
        inputs: &[PathBuf],
        output_name: &str,
        progress: &ProgressReporter,
    ) -> Result<PathBuf, BoxError> {
        fs::create_dir_all(&self.root).await?;

        let output = self.root.join(output_name);
        let mut out = fs::File::create(&output).await?;

        for (i, input) in inputs.iter().enumerate() {
            let mut file = fs::File::open(input).await?;
            let copied = tokio::io::copy(&mut file, &mut out).await?;
            debug!(input = ?input, bytes = copied, "Segment appended");
            progress.report((i + 1) as f64 / inputs.len() as f64);
        }

        out.flush().await?;
        out.sync_all().await?;

        Ok(output)
    }
}
