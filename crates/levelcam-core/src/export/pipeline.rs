use crate::{
    CoreError, CoreResult, LibrarySaver, SealedSession, Stitcher,
    export::{ExportJob, ProgressReporter},
};

use std::{panic::Location, path::PathBuf, sync::Arc};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument};

/// Share of a stitched job's progress spent concatenating.
pub(crate) const STITCH_SHARE: f64 = 0.8;

/// Steps one export job goes through: optional stitch, then save.
pub(crate) struct Pipeline {
    pub(crate) stitcher: Arc<dyn Stitcher>,
    pub(crate) saver: Arc<dyn LibrarySaver>,
    pub(crate) stitch_segments: bool,
}

impl Pipeline {
    #[instrument(skip_all, fields(job_id = %job.id, session_id = %session.id))]
    pub(crate) async fn run(
        &self,
        job: &ExportJob,
        session: &SealedSession,
        progress: &ProgressReporter,
    ) -> CoreResult<()> {
        let segments = &session.segments;

        match segments.len() {
            0 => Err(CoreError::SaveFailed {
                reason: "session has no segments to export".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            1 => {
                debug!("Single segment, saving directly");
                self.save(&segments[0].file, &job.filename).await
            }
            count if self.stitch_segments => {
                let inputs: Vec<PathBuf> = segments.iter().map(|s| s.file.clone()).collect();
                let stitch_progress = progress.sub_range(0.0, STITCH_SHARE);

                info!(segment_count = count, "Stitching segments");

                let artifact = self
                    .stitcher
                    .concatenate(&inputs, &job.filename, &stitch_progress)
                    .await
                    .map_err(|e| CoreError::StitchFailed {
                        reason: e.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    })?;
                stitch_progress.report(1.0);

                self.save(&artifact, &job.filename).await
            }
            count => {
                info!(segment_count = count, "Stitching disabled, saving each segment");

                for (i, segment) in segments.iter().enumerate() {
                    let filename = segment_filename(&job.filename, segment.index);
                    self.save(&segment.file, &filename).await?;
                    progress.report((i + 1) as f64 / count as f64);
                }

                Ok(())
            }
        }
    }

    async fn save(&self, artifact: &std::path::Path, filename: &str) -> CoreResult<()> {
        self.saver
            .save(artifact, filename)
            .await
            .map_err(|e| CoreError::SaveFailed {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!(artifact = ?artifact, filename, "Artifact saved");
        Ok(())
    }
}

/// `clip.mov` → `clip_02.mov` for segment 2.
pub(crate) fn segment_filename(filename: &str, index: usize) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{:02}.{}", stem, index, ext),
        None => format!("{}_{:02}", filename, index),
    }
}
