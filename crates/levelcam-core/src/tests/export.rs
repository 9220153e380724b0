use crate::{
    CaptureConfiguration, CoreError, ExportConfig, ExportQueue, ExportState, JobId,
    OrientationState, RecordingSession, SealedSession, Segment, SegmentFile,
    export::{STITCH_SHARE, segment_filename},
    tests::fakes::{FakeSaver, FakeStitcher, TEST_TIMEOUT, wait_for_job},
};

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::time::timeout;

const SEGMENT_LENGTH: Duration = Duration::from_secs(2);

/// Sealed session with `count` back-to-back segments.
#[allow(clippy::unwrap_used)]
fn sealed_session(count: usize) -> Arc<SealedSession> {
    let mut session = RecordingSession::new(CaptureConfiguration::default(), Duration::ZERO);
    for index in 0..count {
        let started_at = SEGMENT_LENGTH * index as u32;
        session
            .segments
            .append(Segment {
                index,
                orientation: OrientationState::Portrait,
                configuration: CaptureConfiguration::default(),
                file: PathBuf::new(),
                started_at,
                ended_at: None,
                size_bytes: None,
            })
            .unwrap();
        session
            .segments
            .close_current(
                started_at + SEGMENT_LENGTH,
                SegmentFile {
                    path: PathBuf::from(format!("/segments/{}/{}.mov", session.id, index)),
                    size_bytes: Some(4096),
                },
            )
            .unwrap();
    }
    let stopped_at = SEGMENT_LENGTH * count as u32;
    Arc::new(session.seal(stopped_at).unwrap())
}

fn queue(
    stitch_segments: bool,
    stitcher: &Arc<FakeStitcher>,
    saver: &Arc<FakeSaver>,
) -> ExportQueue {
    ExportQueue::spawn(
        ExportConfig {
            stitch_segments,
            ..ExportConfig::default()
        },
        Arc::clone(stitcher) as _,
        Arc::clone(saver) as _,
    )
}

/// WHAT: Submitting the same session twice yields one job
/// WHY: A session must be exported exactly once
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_submitted_session_when_submitting_again_then_same_job() {
    // Given: Queue and a two-segment session
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    let exports = queue(true, &stitcher, &saver);
    let session = sealed_session(2);

    // When: Submitting twice
    let first = exports.submit(Arc::clone(&session)).unwrap();
    let second = exports.submit(Arc::clone(&session)).unwrap();
    wait_for_job(&exports, first, |j| j.is_completed()).await;

    // Then: One job, exported once
    assert_eq!(first, second);
    assert_eq!(exports.jobs().len(), 1);
    assert_eq!(stitcher.calls(), 1);
    assert_eq!(saver.saved().len(), 1);
}

/// WHAT: Generated filenames carry the prefix, a timestamp and the session id
/// WHY: Saved artifacts must be unique and recognisable in the library
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_session_when_submitting_then_filename_follows_pattern() {
    // Given: Queue with default naming
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    let exports = queue(true, &stitcher, &saver);
    let session = sealed_session(1);

    // When: Submitting
    let job_id = exports.submit(Arc::clone(&session)).unwrap();
    let job = exports.job(job_id).unwrap();

    // Then: LevelCam_<YYYYmmdd_HHMMSS>_<8 hex>.mov
    let short = &session.id.to_string()[..8];
    assert!(job.filename.starts_with("LevelCam_"), "{}", job.filename);
    assert!(job.filename.ends_with(&format!("_{}.mov", short)), "{}", job.filename);
    assert_eq!(job.filename.len(), "LevelCam_".len() + 15 + 1 + 8 + ".mov".len());
}

/// WHAT: A single-segment session is saved without stitching
/// WHY: Concatenating one file is wasted work
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_single_segment_when_exporting_then_no_stitch() {
    // Given: Queue with stitching disabled and one-segment session
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    let exports = queue(false, &stitcher, &saver);
    let session = sealed_session(1);

    // When: Exporting
    let job_id = exports.submit(Arc::clone(&session)).unwrap();
    let job = wait_for_job(&exports, job_id, |j| j.is_completed()).await;

    // Then: Segment file saved directly under the job's filename
    assert_eq!(stitcher.calls(), 0);
    assert_eq!(
        saver.saved(),
        vec![(session.segments[0].file.clone(), job.filename.clone())]
    );
    assert_eq!(job.progress, 1.0);
}

/// WHAT: With stitching disabled each segment is saved on its own
/// WHY: Users can opt to keep every orientation as a separate clip
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_stitching_disabled_when_exporting_then_each_segment_saved() {
    // Given: Queue with stitching disabled and a three-segment session
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    let exports = queue(false, &stitcher, &saver);
    let session = sealed_session(3);

    // When: Exporting
    let job_id = exports.submit(Arc::clone(&session)).unwrap();
    let job = wait_for_job(&exports, job_id, |j| j.is_completed()).await;

    // Then: Three saves with numbered names, in segment order
    let saved = saver.saved();
    assert_eq!(stitcher.calls(), 0);
    assert_eq!(saved.len(), 3);
    for (index, (artifact, filename)) in saved.iter().enumerate() {
        assert_eq!(artifact, &session.segments[index].file);
        assert_eq!(filename, &segment_filename(&job.filename, index));
    }
    assert!(saved[2].1.ends_with("_02.mov"));
}

/// WHAT: A save failure can be retried to completion without progress regressing
/// WHY: Failed exports keep their session until the user retries or dismisses
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_save_failure_when_retrying_then_completes_with_monotonic_progress() {
    // Given: Saver that fails once and a progress observer
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    saver.fail_times(1);
    let exports = queue(true, &stitcher, &saver);
    let session = sealed_session(3);

    let mut watch = exports.watch_jobs();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let done = {
                let jobs = watch.borrow_and_update();
                if let Some(job) = jobs.first() {
                    seen.push(job.progress);
                }
                jobs.first().is_some_and(|j| j.is_completed())
            };
            if done || watch.changed().await.is_err() {
                return seen;
            }
        }
    });

    // When: The first attempt fails and the job is retried
    let job_id = exports.submit(Arc::clone(&session)).unwrap();
    let failed = wait_for_job(&exports, job_id, |j| j.error_message().is_some()).await;
    let retried = exports.retry(job_id).unwrap();
    let completed = wait_for_job(&exports, job_id, |j| j.is_completed()).await;
    let seen = timeout(TEST_TIMEOUT, observer).await.unwrap().unwrap();

    // Then: Failure kept the stitched progress, retry completed at exactly 1.0
    assert!(failed.error_message().unwrap().starts_with("Save failed"));
    assert_eq!(failed.progress, STITCH_SHARE);
    assert!(retried);
    assert_eq!(completed.state, ExportState::Completed);
    assert_eq!(completed.progress, 1.0);
    assert_eq!(completed.attempts, 2);
    assert_eq!(stitcher.calls(), 2);
    assert!(
        seen.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {:?}",
        seen
    );
    assert!(!exports.is_saving());
}

/// WHAT: A stitch failure fails the job with a stitching message
/// WHY: Users need to know which step of the export broke
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_stitch_failure_when_exporting_then_job_failed_before_saving() {
    // Given: Stitcher that fails once
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    stitcher.fail_times(1);
    let exports = queue(true, &stitcher, &saver);

    // When: Exporting a two-segment session
    let job_id = exports.submit(sealed_session(2)).unwrap();
    let job = wait_for_job(&exports, job_id, |j| j.error_message().is_some()).await;

    // Then: Failed with a stitching message and nothing saved
    assert!(job.error_message().unwrap().starts_with("Stitching failed"));
    assert!(saver.saved().is_empty());
}

/// WHAT: An empty session fails instead of saving nothing
/// WHY: Every completed job must correspond to a saved artifact
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_empty_session_when_exporting_then_job_failed() {
    // Given: Session without segments
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    let exports = queue(true, &stitcher, &saver);

    // When: Exporting it
    let job_id = exports.submit(sealed_session(0)).unwrap();
    let job = wait_for_job(&exports, job_id, |j| j.error_message().is_some()).await;

    // Then: Failed with a save error
    assert_eq!(
        job.error_message(),
        Some("Save failed: session has no segments to export")
    );
}

/// WHAT: Retry only applies to failed jobs and unknown ids are errors
/// WHY: Completed work must not be exported twice
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_completed_or_unknown_job_when_retrying_then_ignored_or_not_found() {
    // Given: A completed job
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    let exports = queue(true, &stitcher, &saver);
    let job_id = exports.submit(sealed_session(1)).unwrap();
    wait_for_job(&exports, job_id, |j| j.is_completed()).await;

    // When: Retrying it and an unknown id
    let completed = exports.retry(job_id).unwrap();
    let unknown = exports.retry(JobId::new());

    // Then: No-op and not found
    assert!(!completed);
    assert!(matches!(unknown, Err(CoreError::JobNotFound { .. })));
    assert_eq!(saver.saved().len(), 1);
}

/// WHAT: Dismissing a finished job removes it from the list
/// WHY: The job list only shows exports the user still cares about
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_finished_job_when_dismissed_then_removed() {
    // Given: One failed and one completed job
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    saver.fail_times(1);
    let exports = queue(true, &stitcher, &saver);
    let failing = exports.submit(sealed_session(1)).unwrap();
    wait_for_job(&exports, failing, |j| j.error_message().is_some()).await;
    let succeeding = exports.submit(sealed_session(1)).unwrap();
    wait_for_job(&exports, succeeding, |j| j.is_completed()).await;

    // When: Dismissing both
    let dismissed_failed = exports.dismiss(failing).unwrap();
    let dismissed_completed = exports.dismiss(succeeding).unwrap();

    // Then: The list is empty and the ids are gone
    assert!(dismissed_failed);
    assert!(dismissed_completed);
    assert!(exports.jobs().is_empty());
    assert!(exports.progress(failing).is_none());
    assert!(matches!(
        exports.dismiss(failing),
        Err(CoreError::JobNotFound { .. })
    ));
}

/// WHAT: Jobs still waiting cannot be dismissed
/// WHY: Dismiss never cancels work in flight
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_pending_job_when_dismissed_then_kept() {
    // Given: One slow job occupying the only worker, a second one queued
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    saver.delay_each(Duration::from_millis(100));
    let exports = queue(true, &stitcher, &saver);
    let running = exports.submit(sealed_session(1)).unwrap();
    let queued = exports.submit(sealed_session(1)).unwrap();

    // When: Dismissing the queued job
    let dismissed = exports.dismiss(queued).unwrap();

    // Then: Kept and eventually exported
    assert!(!dismissed);
    assert!(exports.is_saving());
    wait_for_job(&exports, running, |j| j.is_completed()).await;
    wait_for_job(&exports, queued, |j| j.is_completed()).await;
    assert_eq!(exports.jobs().len(), 2);
}

/// WHAT: Jobs run in submission order with one worker
/// WHY: Exports finish in the order sessions were recorded
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_several_jobs_when_single_worker_then_saved_in_submission_order() {
    // Given: Slow saver and three single-segment sessions
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    saver.delay_each(Duration::from_millis(20));
    let exports = queue(true, &stitcher, &saver);
    let sessions: Vec<_> = (0..3).map(|_| sealed_session(1)).collect();

    // When: Submitting all three
    let ids: Vec<_> = sessions
        .iter()
        .map(|s| exports.submit(Arc::clone(s)).unwrap())
        .collect();
    for id in &ids {
        wait_for_job(&exports, *id, |j| j.is_completed()).await;
    }

    // Then: Saved in the same order as submitted
    let saved: Vec<_> = saver.saved().into_iter().map(|(artifact, _)| artifact).collect();
    let expected: Vec<_> = sessions.iter().map(|s| s.segments[0].file.clone()).collect();
    assert_eq!(saved, expected);
    assert_eq!(
        exports.jobs().iter().map(|j| j.id).collect::<Vec<_>>(),
        ids
    );
}

/// WHAT: A failed job leaves the queue moving and a retry rejoins at the tail
/// WHY: One bad export must not hold back the sessions recorded after it
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_failed_head_job_when_retried_then_queued_behind_later_jobs() {
    // Given: One worker, a saver that blocks every save and fails the first
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    saver.fail_times(1);
    let (entered, release) = saver.block_saves();
    let exports = queue(true, &stitcher, &saver);
    let sessions: Vec<_> = (0..3).map(|_| sealed_session(1)).collect();
    let ids: Vec<_> = sessions
        .iter()
        .map(|s| exports.submit(Arc::clone(s)).unwrap())
        .collect();
    let (a, b, c) = (ids[0], ids[1], ids[2]);

    // When: A is saving
    timeout(TEST_TIMEOUT, entered.acquire()).await.unwrap().unwrap().forget();

    // Then: B and C wait untouched
    assert_eq!(exports.job(a).unwrap().state, ExportState::Running);
    for id in [b, c] {
        let job = exports.job(id).unwrap();
        assert_eq!((job.state, job.progress), (ExportState::Pending, 0.0));
    }

    // When: A's save fails and B starts
    release.add_permits(1);
    let failed = wait_for_job(&exports, a, |j| j.error_message().is_some()).await;
    timeout(TEST_TIMEOUT, entered.acquire()).await.unwrap().unwrap().forget();

    // Then: B runs after A failed
    assert_eq!(exports.job(b).unwrap().state, ExportState::Running);
    assert_eq!(exports.job(c).unwrap().state, ExportState::Pending);

    // When: Retrying A while B runs, then letting every save through
    assert!(exports.retry(a).unwrap());
    let requeued = exports.job(a).unwrap();
    release.add_permits(3);
    for id in &ids {
        wait_for_job(&exports, *id, |j| j.is_completed()).await;
    }

    // Then: A waited behind C, keeping its progress meanwhile
    assert_eq!(requeued.state, ExportState::Pending);
    assert_eq!(requeued.progress, failed.progress);
    let saved: Vec<_> = saver.saved().into_iter().map(|(artifact, _)| artifact).collect();
    let expected: Vec<_> = [1, 2, 0]
        .iter()
        .map(|&i| sessions[i].segments[0].file.clone())
        .collect();
    assert_eq!(saved, expected);
    assert_eq!(exports.job(a).unwrap().attempts, 2);
}

/// WHAT: Dismissing a session's job lets it be submitted again
/// WHY: The session-to-job mapping only lives as long as the listed job
#[tokio::test]
#[allow(clippy::unwrap_used)]
async fn given_dismissed_job_when_resubmitting_session_then_new_job() {
    // Given: A completed and dismissed job
    let (stitcher, saver) = (FakeStitcher::new(), FakeSaver::new());
    let exports = queue(true, &stitcher, &saver);
    let session = sealed_session(1);
    let first = exports.submit(Arc::clone(&session)).unwrap();
    wait_for_job(&exports, first, |j| j.is_completed()).await;
    exports.dismiss(first).unwrap();

    // When: Submitting the same session again
    let second = exports.submit(Arc::clone(&session)).unwrap();
    wait_for_job(&exports, second, |j| j.is_completed()).await;

    // Then: A different job exported it again
    assert_ne!(first, second);
    assert_eq!(saver.saved().len(), 2);
}
