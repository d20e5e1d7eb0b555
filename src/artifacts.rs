//! # Artifact Layout
//!
//! Where the pipeline writes its inspection artifacts: the conditioned image
//! and one image per rotation attempt. Every run overwrites the previous run's
//! files, so callers that process documents concurrently must give each
//! request its own layout.

use std::path::{Path, PathBuf};

use crate::orientation::Rotation;

/// Default output directory, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// File name of the conditioned image
pub const CONDITIONED_IMAGE_NAME: &str = "temp_processed.png";

/// Paths of the artifacts written by one extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    output_dir: PathBuf,
}

impl ArtifactLayout {
    /// Create a layout rooted at `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Create a layout namespaced under `base` for a single request
    ///
    /// Path separators in `request_id` are replaced so the request cannot
    /// escape `base`.
    pub fn for_request(base: impl AsRef<Path>, request_id: &str) -> Self {
        let sanitized: String = request_id
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        let sanitized = match sanitized.as_str() {
            "" | "." | ".." => "_".to_string(),
            _ => sanitized,
        };
        Self::new(base.as_ref().join(sanitized))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the conditioned (binarized) image
    pub fn conditioned_image_path(&self) -> PathBuf {
        self.output_dir.join(CONDITIONED_IMAGE_NAME)
    }

    /// Path of the diagnostic image for `rotation`, e.g. `debug_90_deg.png`
    pub fn rotation_image_path(&self, rotation: Rotation) -> PathBuf {
        self.output_dir
            .join(format!("debug_{}.png", rotation.label()))
    }

    /// Create the output directory if it does not exist yet
    pub fn ensure_output_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
    }
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}
