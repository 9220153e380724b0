
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Scratch directory removed when dropped.
pub(crate) struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub(crate) fn new() -> Self {
        let path = std::env::temp_dir().join(format!("levelcam-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path).expect("create scratch dir");
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
