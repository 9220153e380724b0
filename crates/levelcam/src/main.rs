//! LevelCam: replays recorded device attitude through the orientation-segmented
//! recorder and exports the resulting take.

mod app;
mod config;
mod error;
mod file_segment_writer;
mod file_stitcher;
mod library_folder;
mod logging_camera;
#[cfg(test)]
mod tests;
mod trace;

pub(crate) use {
    app::{App, TakeSummary},
    error::{AppError, Result as AppResult},
    file_segment_writer::FileSegmentWriter,
    file_stitcher::FileStitcher,
    library_folder::LibraryFolder,
    logging_camera::LoggingCamera,
};

use crate::{config::Config, trace::Trace};

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "levelcam=debug,levelcam_core=debug";

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "levelcam",
    version,
    about = "Record an attitude trace as orientation-consistent clips"
)]
struct Args {
    /// Attitude trace (TOML) to replay.
    trace: PathBuf,

    /// Configuration file to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// How many times failed exports are retried before giving up.
    #[arg(long, default_value_t = 1)]
    retries: u32,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

/// Application entry point.
fn main() {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let trace = match Trace::load(&args.trace) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to load trace: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    let app = App {
        config,
        trace,
        max_retries: args.retries,
    };

    let summary = match rt.block_on(app.run()) {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = ?e, "Take failed");
            std::process::exit(1);
        }
    };

    if report(&summary) {
        std::process::exit(1);
    }
}

/// Logs the take; returns whether any export failed.
fn report(summary: &TakeSummary) -> bool {
    match &summary.session {
        Some(session) => {
            info!(
                session_id = %session.id,
                segments = session.segments.len(),
                duration_ms = session.duration().as_millis(),
                "Take recorded"
            );
            for segment in session.segments.iter() {
                info!(
                    index = segment.index,
                    orientation = %segment.orientation,
                    configuration = %segment.configuration,
                    started_ms = segment.started_at.as_millis(),
                    ended_ms = segment.ended_at.unwrap_or_default().as_millis(),
                    file = ?segment.file,
                    "Segment"
                );
            }
        }
        None => warn!("No session was recorded"),
    }

    let mut any_failed = false;
    for job in &summary.jobs {
        match job.error_message() {
            None => info!(
                job_id = %job.id,
                filename = %job.filename,
                attempts = job.attempts,
                "Export completed"
            ),
            Some(message) => {
                any_failed = true;
                error!(
                    job_id = %job.id,
                    filename = %job.filename,
                    attempts = job.attempts,
                    error = message,
                    "Export failed"
                );
            }
        }
    }

    any_failed
}
