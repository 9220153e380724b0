//! Configuration management for levelcam.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{ExportSettings, OrientationConfig, StorageConfig},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::Path,
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use levelcam_core::CaptureConfiguration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Camera configuration new sessions start with.
    #[serde(default)]
    pub capture: CaptureConfiguration,
    /// Orientation classifier tuning.
    #[serde(default)]
    pub orientation: OrientationConfig,
    /// Export queue settings.
    #[serde(default)]
    pub export: ExportSettings,
    /// Segment and library directories.
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from `path`, or from the platform config directory
    /// when `path` is `None`.
    ///
    /// A missing file is created with defaults. Default storage lives next
    /// to an explicit `path`, or in the platform data directory otherwise.
    #[track_caller]
    #[instrument]
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let (config_path, storage_root) = match path {
            Some(path) => (
                path.to_path_buf(),
                path.parent().map(Path::to_path_buf).unwrap_or_default(),
            ),
            None => {
                let proj_dirs = Self::project_dirs()?;
                (
                    proj_dirs.config_dir().join("config.toml"),
                    proj_dirs.data_dir().to_path_buf(),
                )
            }
        };

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to parse config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            config.validate()?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else {
            info!(config_path = ?config_path, "No config found, creating default");
            let config = Self::with_storage_root(&storage_root);
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Defaults with both storage directories under `root`.
    pub fn with_storage_root(root: &Path) -> Self {
        Config {
            capture: CaptureConfiguration::default(),
            orientation: OrientationConfig::default(),
            export: ExportSettings::default(),
            storage: StorageConfig {
                segment_dir: root.join("segments"),
                library_dir: root.join("library"),
            },
        }
    }

    /// Rejects settings the pipeline cannot run with.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |reason: String| AppError::ConfigError {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        let landscape = self.orientation.landscape_threshold_deg;
        if !(landscape > 0.0 && landscape < 90.0) {
            return Err(invalid(format!(
                "landscape_threshold_deg must be between 0 and 90, got {}",
                landscape
            )));
        }

        let flat = self.orientation.flat_threshold_deg;
        if !(flat > 0.0 && flat <= 90.0) {
            return Err(invalid(format!(
                "flat_threshold_deg must be in (0, 90], got {}",
                flat
            )));
        }

        if self.export.worker_count == 0 {
            return Err(invalid("worker_count must be at least 1".to_string()));
        }

        let prefix = &self.export.filename_prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(invalid(format!(
                "filename_prefix must be a non-empty file name, got {:?}",
                prefix
            )));
        }

        if self.capture.frame_rate == 0 {
            return Err(invalid("frame_rate must be positive".to_string()));
        }

        Ok(())
    }

    /// Save configuration to `path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                debug!(config_dir = ?parent, "Created config directory");
            }
        }

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "levelcam", "LevelCam").ok_or_else(|| AppError::ConfigError {
            reason: "Failed to get project directories".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
