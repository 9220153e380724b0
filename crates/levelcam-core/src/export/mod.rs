mod job;
mod pipeline;
mod progress;
mod queue;
mod table;

pub use {
    job::{ExportJob, ExportState, JobId},
    progress::ProgressReporter,
    queue::{DEFAULT_WORKER_COUNT, ExportConfig, ExportQueue},
};

#[cfg(test)]
pub(crate) use pipeline::{STITCH_SHARE, segment_filename};
