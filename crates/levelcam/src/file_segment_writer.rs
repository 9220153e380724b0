use levelcam_core::{BoxError, SegmentFile, SegmentHandle, SegmentRequest, SegmentWriter};

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument};

/// Writes each segment as a file under `<root>/<session id>/`.
///
/// Encoding happens elsewhere; the file carries a one-line header naming
/// the orientation and configuration it was opened with, which is enough
/// for stitching and saving to be observable end to end.
pub struct FileSegmentWriter {
    root: PathBuf,
}

impl FileSegmentWriter {
    /// Writer rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl SegmentWriter for FileSegmentWriter {
    #[instrument(skip(self), fields(session_id = %request.session_id, index = request.index))]
    async fn open_segment(&self, request: SegmentRequest) -> Result<SegmentHandle, BoxError> {
        let dir = self.root.join(request.session_id.to_string());
        fs::create_dir_all(&dir).await?;

        let path = dir.join(format!(
            "segment_{:03}_{}.mov",
            request.index, request.orientation
        ));

        let mut file = fs::File::create(&path).await?;
        let header = format!(
            "segment {} orientation={} configuration={}\n",
            request.index, request.orientation, request.configuration
        );
        file.write_all(header.as_bytes()).await?;
        file.flush().await?;

        debug!(path = ?path, "Segment file opened");

        Ok(SegmentHandle {
            index: request.index,
            path,
        })
    }

    #[instrument(skip(self), fields(index = handle.index))]
    async fn close_segment(&self, handle: SegmentHandle) -> Result<SegmentFile, BoxError> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&handle.path)
            .await?;
        file.write_all(format!("end of segment {}\n", handle.index).as_bytes())
            .await?;
        file.sync_all().await?;

        let size_bytes = fs::metadata(&handle.path).await?.len();

        debug!(path = ?handle.path, size_bytes, "Segment file closed");

        Ok(SegmentFile {
            path: handle.path,
            size_bytes: Some(size_bytes),
        })
    }
}
