use crate::{
    SealedSession, SessionId,
    export::{ExportJob, ExportState, JobId},
};

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::watch;
use tracing::error;

struct JobEntry {
    job: ExportJob,
    /// Released once the job completes; kept while a retry may need it.
    session: Option<Arc<SealedSession>>,
}

#[derive(Default)]
struct Entries {
    order: Vec<JobId>,
    jobs: HashMap<JobId, JobEntry>,
    by_session: HashMap<SessionId, JobId>,
}

/// Shared job list. Only the queue and its workers mutate it; everyone else
/// reads snapshots.
pub(crate) struct JobTable {
    entries: Mutex<Entries>,
    jobs_tx: watch::Sender<Vec<ExportJob>>,
}

impl JobTable {
    pub(crate) fn new() -> Self {
        let (jobs_tx, _) = watch::channel(Vec::new());
        Self {
            entries: Mutex::new(Entries::default()),
            jobs_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A poisoned table still holds consistent job records.
        self.entries.lock().unwrap_or_else(|e| {
            error!("Export job table lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }

    fn publish(&self, entries: &Entries) {
        let views = entries
            .order
            .iter()
            .filter_map(|id| entries.jobs.get(id))
            .map(|entry| entry.job.clone())
            .collect();
        self.jobs_tx.send_replace(views);
    }

    /// Existing job for `session_id`, if one is listed.
    pub(crate) fn job_for_session(&self, session_id: SessionId) -> Option<JobId> {
        self.lock().by_session.get(&session_id).copied()
    }

    /// Adds a job unless its session already has one; returns the job's id.
    pub(crate) fn insert(&self, job: ExportJob, session: Arc<SealedSession>) -> (JobId, bool) {
        let mut entries = self.lock();

        if let Some(existing) = entries.by_session.get(&job.session_id) {
            return (*existing, false);
        }

        let id = job.id;
        entries.by_session.insert(job.session_id, id);
        entries.order.push(id);
        entries.jobs.insert(
            id,
            JobEntry {
                job,
                session: Some(session),
            },
        );
        self.publish(&entries);
        (id, true)
    }

    pub(crate) fn get(&self, id: JobId) -> Option<ExportJob> {
        self.lock().jobs.get(&id).map(|e| e.job.clone())
    }

    pub(crate) fn snapshot(&self) -> Vec<ExportJob> {
        self.jobs_tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Vec<ExportJob>> {
        self.jobs_tx.subscribe()
    }

    /// Raises a job's progress; lower values are ignored.
    pub(crate) fn raise_progress(&self, id: JobId, progress: f64) {
        let mut entries = self.lock();
        let Some(entry) = entries.jobs.get_mut(&id) else {
            return;
        };

        if entry.job.state != ExportState::Running {
            return;
        }

        let progress = progress.clamp(0.0, 1.0);
        if progress > entry.job.progress {
            entry.job.progress = progress;
            self.publish(&entries);
        }
    }

    /// Pending → Running. Returns the session to export, or `None` if the
    /// job is gone or not pending.
    pub(crate) fn begin(&self, id: JobId) -> Option<Arc<SealedSession>> {
        let mut entries = self.lock();
        let entry = entries.jobs.get_mut(&id)?;

        if entry.job.state != ExportState::Pending {
            return None;
        }

        let session = entry.session.clone()?;
        entry.job.state = ExportState::Running;
        entry.job.attempts += 1;
        self.publish(&entries);
        Some(session)
    }

    /// Running → Completed with progress exactly 1.0; releases the session.
    pub(crate) fn complete(&self, id: JobId) {
        let mut entries = self.lock();
        let Some(entry) = entries.jobs.get_mut(&id) else {
            return;
        };

        entry.job.state = ExportState::Completed;
        entry.job.progress = 1.0;
        entry.session = None;
        self.publish(&entries);
    }

    /// Running → Failed, keeping progress and the session for retry.
    pub(crate) fn fail(&self, id: JobId, message: String) {
        let mut entries = self.lock();
        let Some(entry) = entries.jobs.get_mut(&id) else {
            return;
        };

        entry.job.state = ExportState::Failed(message);
        self.publish(&entries);
    }

    /// Failed → Pending. Returns whether the job was re-armed.
    pub(crate) fn rearm(&self, id: JobId) -> Option<bool> {
        let mut entries = self.lock();
        let entry = entries.jobs.get_mut(&id)?;

        if !matches!(entry.job.state, ExportState::Failed(_)) || entry.session.is_none() {
            return Some(false);
        }

        entry.job.state = ExportState::Pending;
        self.publish(&entries);
        Some(true)
    }

    /// Removes a terminal job. Returns whether it was removed.
    pub(crate) fn remove_terminal(&self, id: JobId) -> Option<bool> {
        let mut entries = self.lock();
        let entry = entries.jobs.get(&id)?;

        if !entry.job.state.is_terminal() {
            return Some(false);
        }

        let session_id = entry.job.session_id;
        entries.jobs.remove(&id);
        entries.order.retain(|j| *j != id);
        entries.by_session.remove(&session_id);
        self.publish(&entries);
        Some(true)
    }
}
