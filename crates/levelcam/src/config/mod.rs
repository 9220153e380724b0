#[allow(clippy::module_inception)]
mod config;
mod export_config;
mod orientation_config;
mod storage_config;

pub(crate) use {
    config::Config, export_config::ExportSettings, orientation_config::OrientationConfig,
    storage_config::StorageConfig,
};

pub(crate) const DEFAULT_DWELL_MS: u64 = 400;
pub(crate) const DEFAULT_LANDSCAPE_THRESHOLD_DEG: f64 = 45.0;
pub(crate) const DEFAULT_FLAT_THRESHOLD_DEG: f64 = 70.0;
pub(crate) const DEFAULT_STITCH_SEGMENTS: bool = true;
pub(crate) const DEFAULT_FILENAME_PREFIX: &str = "LevelCam";

pub(crate) fn default_dwell_ms() -> u64 {
    DEFAULT_DWELL_MS
}

pub(crate) fn default_landscape_threshold_deg() -> f64 {
    DEFAULT_LANDSCAPE_THRESHOLD_DEG
}

pub(crate) fn default_flat_threshold_deg() -> f64 {
    DEFAULT_FLAT_THRESHOLD_DEG
}

pub(crate) fn default_stitch_segments() -> bool {
    DEFAULT_STITCH_SEGMENTS
}

pub(crate) fn default_worker_count() -> usize {
    levelcam_core::DEFAULT_WORKER_COUNT
}

pub(crate) fn default_filename_prefix() -> String {
    DEFAULT_FILENAME_PREFIX.to_string()
}
