//! # OCR Processing Module
//!
//! This module defines the boundary to the OCR engine and its production
//! implementation backed by Tesseract.
//!
//! ## Engine Contract
//!
//! ```text
//! recognize(image, psm = SingleColumn) -> (text, mean_confidence in [-1, 100])
//! ```
//!
//! The orientation search only depends on the [`OcrEngine`] trait, so tests and
//! alternative engines can be plugged in without Tesseract installed.
//!
//! ## Dependencies
//!
//! - `leptess`: Rust bindings for Tesseract OCR and Leptonica
//! - `parking_lot`: lock around the shared Tesseract handle

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

pub use crate::instance_manager::OcrInstanceManager;
pub use crate::ocr_config::OcrConfig;
pub use crate::ocr_errors::OcrError;

/// Raw output of one engine invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Recognized UTF-8 text, exactly as produced by the engine
    pub text: String,
    /// Mean confidence reported by the engine, -1 when it could not score
    pub mean_confidence: i32,
}

/// An OCR engine able to read the text of an image file
///
/// Implementations block the calling thread; callers that need a timeout run
/// them on a blocking thread pool.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text of the image stored at `image_path`
    fn recognize(&self, image_path: &Path) -> Result<Recognition, OcrError>;

    /// Short engine name used in logs
    fn name(&self) -> &str {
        "ocr"
    }
}

/// Tesseract-backed engine
///
/// Requests the page segmentation mode from the configuration on every
/// instance it creates (single column by default, which suits list-like
/// receipts and invoices).
pub struct TesseractEngine {
    config: OcrConfig,
    instances: OcrInstanceManager,
}

impl TesseractEngine {
    /// Create an engine; Tesseract itself is initialized lazily on first use
    pub fn new(config: OcrConfig) -> Self {
        Self {
            config,
            instances: OcrInstanceManager::new(),
        }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Initialize Tesseract eagerly, reporting an init failure up front
    pub fn warm_up(&self) -> Result<(), OcrError> {
        self.instances.get_instance(&self.config).map(|_| ())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image_path: &Path) -> Result<Recognition, OcrError> {
        let ocr_start_time = Instant::now();

        let instance = self.instances.get_instance(&self.config)?;

        let recognition = {
            let mut tess = instance.lock();

            let path_str = image_path.to_string_lossy();
            tess.set_image(&*path_str).map_err(|e| {
                OcrError::ImageLoad(format!(
                    "Failed to load image {} for OCR: {}",
                    image_path.display(),
                    e
                ))
            })?;

            let text = tess.get_utf8_text().map_err(|e| {
                OcrError::Extraction(format!("Failed to extract text from image: {}", e))
            })?;

            Recognition {
                text,
                mean_confidence: tess.mean_text_conf(),
            }
        };

        info!(
            "OCR processing completed in {}ms, extracted {} characters (confidence {})",
            ocr_start_time.elapsed().as_millis(),
            recognition.text.chars().count(),
            recognition.mean_confidence
        );
        debug!(image = %image_path.display(), "Recognized text: {:?}", recognition.text);

        Ok(recognition)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Runs a blocking engine call on the blocking pool, bounded by `timeout`.
///
/// Expiry is reported as `OcrError::Timeout`. The abandoned call keeps running
/// to completion in the background; Tesseract cannot be interrupted mid-page.
pub async fn recognize_with_timeout(
    engine: std::sync::Arc<dyn OcrEngine>,
    image_path: std::path::PathBuf,
    timeout: Duration,
) -> Result<Recognition, OcrError> {
    let task = tokio::task::spawn_blocking(move || engine.recognize(&image_path));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(OcrError::Extraction(format!(
            "OCR worker terminated abnormally: {}",
            join_error
        ))),
        Err(_) => Err(OcrError::Timeout(format!(
            "OCR operation timed out after {} seconds",
            timeout.as_secs_f64()
        ))),
    }
}

/// Drives `future` on a fresh multi-threaded runtime, then gives blocking
/// calls abandoned by [`recognize_with_timeout`] at most `grace` to finish.
/// Dropping the runtime instead would wait on them without limit.
pub fn block_on_with_shutdown_grace<F: Future>(
    future: F,
    grace: Duration,
) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    Ok(output)
}
