//! In-memory collaborators with scripted failures.

use crate::{
    BoxError, CameraConfigurator, CaptureConfiguration, ExportJob, ExportQueue, JobId,
    LibrarySaver, ProgressReporter, SegmentFile, SegmentHandle, SegmentRequest, SegmentWriter,
    Stitcher,
};

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Semaphore, time::timeout};

/// Upper bound for any single await in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Waits until job `id` satisfies `pred` and returns its snapshot.
#[allow(clippy::unwrap_used)]
pub async fn wait_for_job(
    queue: &ExportQueue,
    id: JobId,
    pred: impl Fn(&ExportJob) -> bool,
) -> ExportJob {
    let mut jobs = queue.watch_jobs();
    let jobs = timeout(
        TEST_TIMEOUT,
        jobs.wait_for(|jobs| jobs.iter().any(|j| j.id == id && pred(j))),
    )
    .await
    .unwrap()
    .unwrap();
    jobs.iter().find(|j| j.id == id).cloned().unwrap()
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
pub struct FakeWriter {
    pub opened: Mutex<Vec<SegmentRequest>>,
    pub closed: Mutex<Vec<usize>>,
    fail_open_index: Mutex<Option<usize>>,
    fail_close_index: Mutex<Option<usize>>,
    /// When set, opening a segment with an index at or above the threshold
    /// waits for a permit.
    gate: Mutex<Option<(usize, Arc<Semaphore>)>>,
}

impl FakeWriter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_open_at(&self, index: usize) {
        *guard(&self.fail_open_index) = Some(index);
    }

    pub fn fail_close_at(&self, index: usize) {
        *guard(&self.fail_close_index) = Some(index);
    }

    /// Holds every open from `index` on until the returned semaphore gets a
    /// permit.
    pub fn block_opens_from(&self, index: usize) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *guard(&self.gate) = Some((index, Arc::clone(&semaphore)));
        semaphore
    }

    pub fn opened(&self) -> Vec<SegmentRequest> {
        guard(&self.opened).clone()
    }

    pub fn closed(&self) -> Vec<usize> {
        guard(&self.closed).clone()
    }
}

#[async_trait]
impl SegmentWriter for FakeWriter {
    async fn open_segment(&self, request: SegmentRequest) -> Result<SegmentHandle, BoxError> {
        let gate = guard(&self.gate)
            .as_ref()
            .filter(|(from, _)| request.index >= *from)
            .map(|(_, semaphore)| Arc::clone(semaphore));
        if let Some(semaphore) = gate {
            semaphore.acquire().await?.forget();
        }

        if *guard(&self.fail_open_index) == Some(request.index) {
            return Err(format!("disk full opening segment {}", request.index).into());
        }

        guard(&self.opened).push(request);
        Ok(SegmentHandle {
            index: request.index,
            path: PathBuf::from(format!("/tmp/{}/segment_{:03}.mov", request.session_id, request.index)),
        })
    }

    async fn close_segment(&self, handle: SegmentHandle) -> Result<SegmentFile, BoxError> {
        if *guard(&self.fail_close_index) == Some(handle.index) {
            return Err(format!("writer lost segment {}", handle.index).into());
        }

        guard(&self.closed).push(handle.index);
        Ok(SegmentFile {
            path: handle.path,
            size_bytes: Some(1024),
        })
    }
}

#[derive(Default)]
pub struct FakeCamera {
    pub applied: Mutex<Vec<CaptureConfiguration>>,
    fail: Mutex<bool>,
    /// `(entered, release)`: each apply adds an `entered` permit, then waits
    /// for a `release` permit.
    gate: Mutex<Option<(Arc<Semaphore>, Arc<Semaphore>)>>,
}

impl FakeCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self) {
        *guard(&self.fail) = true;
    }

    /// Makes every apply wait. Returns `(entered, release)` semaphores.
    pub fn block_applies(&self) -> (Arc<Semaphore>, Arc<Semaphore>) {
        let entered = Arc::new(Semaphore::new(0));
        let release = Arc::new(Semaphore::new(0));
        *guard(&self.gate) = Some((Arc::clone(&entered), Arc::clone(&release)));
        (entered, release)
    }

    pub fn applied(&self) -> Vec<CaptureConfiguration> {
        guard(&self.applied).clone()
    }
}

#[async_trait]
impl CameraConfigurator for FakeCamera {
    async fn apply_configuration(
        &self,
        configuration: &CaptureConfiguration,
    ) -> Result<(), BoxError> {
        let gate = guard(&self.gate).clone();
        if let Some((entered, release)) = gate {
            entered.add_permits(1);
            release.acquire().await?.forget();
        }

        let mut fail = guard(&self.fail);
        if *fail {
            *fail = false;
            return Err("camera busy".into());
        }
        drop(fail);

        guard(&self.applied).push(*configuration);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStitcher {
    pub calls: AtomicUsize,
    pub inputs: Mutex<Vec<Vec<PathBuf>>>,
    failures_left: AtomicUsize,
}

impl FakeStitcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_times(&self, times: usize) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Stitcher for FakeStitcher {
    async fn concatenate(
        &self,
        inputs: &[PathBuf],
        output_name: &str,
        progress: &ProgressReporter,
    ) -> Result<PathBuf, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        guard(&self.inputs).push(inputs.to_vec());

        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err("composition rejected".into());
        }

        progress.report(0.5);
        Ok(PathBuf::from("/tmp/stitched").join(output_name))
    }
}

#[derive(Default)]
pub struct FakeSaver {
    pub saved: Mutex<Vec<(PathBuf, String)>>,
    failures_left: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    gate: Mutex<Option<(Arc<Semaphore>, Arc<Semaphore>)>>,
}

impl FakeSaver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_times(&self, times: usize) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    pub fn delay_each(&self, delay: Duration) {
        *guard(&self.delay) = Some(delay);
    }

    /// Makes every save wait. Returns `(entered, release)` semaphores.
    pub fn block_saves(&self) -> (Arc<Semaphore>, Arc<Semaphore>) {
        let entered = Arc::new(Semaphore::new(0));
        let release = Arc::new(Semaphore::new(0));
        *guard(&self.gate) = Some((Arc::clone(&entered), Arc::clone(&release)));
        (entered, release)
    }

    pub fn saved(&self) -> Vec<(PathBuf, String)> {
        guard(&self.saved).clone()
    }
}

#[async_trait]
impl LibrarySaver for FakeSaver {
    async fn save(&self, artifact: &Path, filename: &str) -> Result<(), BoxError> {
        let gate = guard(&self.gate).clone();
        if let Some((entered, release)) = gate {
            entered.add_permits(1);
            release.acquire().await?.forget();
        }

        let delay = *guard(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err("photo library permission denied".into());
        }

        guard(&self.saved).push((artifact.to_path_buf(), filename.to_string()));
        Ok(())
    }
}
