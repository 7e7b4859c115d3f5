//! Best-effort export of conditioned images for operator inspection

use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Receives each conditioned image after the pipeline finishes
pub trait PreprocessObserver: Send + Sync {
    fn on_conditioned(&self, source: &Path, image: &DynamicImage);
}

/// Writes `preprocessed_<basename>` into a directory; failures only log
#[derive(Debug, Clone)]
pub struct DebugArtifactWriter {
    dir: PathBuf,
}

impl DebugArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Artifacts land in the process working directory
    pub fn in_working_dir() -> Self {
        Self::new(".")
    }

    pub fn artifact_path(&self, source: &Path) -> Option<PathBuf> {
        let name = source.file_name()?;
        let mut file_name = std::ffi::OsString::from("preprocessed_");
        file_name.push(name);
        Some(self.dir.join(file_name))
    }
}

impl PreprocessObserver for DebugArtifactWriter {
    fn on_conditioned(&self, source: &Path, image: &DynamicImage) {
        let Some(path) = self.artifact_path(source) else {
            tracing::warn!("No file name in {:?}, skipping debug artifact", source);
            return;
        };

        match image.save(&path) {
            Ok(()) => tracing::info!(
                "Preprocessed image saved as {:?} ({}x{})",
                path,
                image.width(),
                image.height()
            ),
            Err(e) => tracing::warn!("Failed to save debug artifact {:?}: {}", path, e),
        }
    }
}
