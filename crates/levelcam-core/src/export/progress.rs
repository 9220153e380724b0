use crate::export::{JobId, table::JobTable};

use std::sync::Arc;

/// Reports progress for one stage of an export job.
///
/// Fractions passed to [`report`] are in `[0, 1]` relative to the stage and
/// are mapped onto the stage's share of the whole job. The job's progress
/// only ever moves forward.
///
/// [`report`]: ProgressReporter::report
#[derive(Clone)]
pub struct ProgressReporter {
    job_id: JobId,
    table: Arc<JobTable>,
    start: f64,
    end: f64,
}

impl ProgressReporter {
    pub(crate) fn new(job_id: JobId, table: Arc<JobTable>, start: f64, end: f64) -> Self {
        Self {
            job_id,
            table,
            start,
            end,
        }
    }

    /// Job this reporter updates.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Records that `fraction` of this stage is done.
    pub fn report(&self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.table
            .raise_progress(self.job_id, self.start + fraction * (self.end - self.start));
    }

    /// Reporter for a sub-range `[from, to]` of this stage.
    pub(crate) fn sub_range(&self, from: f64, to: f64) -> Self {
        let span = self.end - self.start;
        Self {
            job_id: self.job_id,
            table: Arc::clone(&self.table),
            start: self.start + from.clamp(0.0, 1.0) * span,
            end: self.start + to.clamp(0.0, 1.0) * span,
        }
    }
}
