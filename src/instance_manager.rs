//! # OCR Instance Manager Module
//!
//! This module provides thread-safe reuse of Tesseract instances.
//! Reusing instances avoids paying the initialization cost on every rotation
//! attempt of the orientation search.

use leptess::LepTess;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::ocr_config::{ModelType, OcrConfig};
use crate::ocr_errors::OcrError;

/// Thread-safe OCR instance manager for reusing Tesseract instances
///
/// Instances are keyed by language and model type. A failed initialization is
/// never cached, so the next request tries again from scratch; this is what
/// lets a later rotation attempt recover from a transient init failure.
pub struct OcrInstanceManager {
    instances: Mutex<HashMap<String, Arc<Mutex<LepTess>>>>,
}

impl OcrInstanceManager {
    /// Create a new OCR instance manager
    ///
    /// ```rust
    /// use docproc::instance_manager::OcrInstanceManager;
    ///
    /// let manager = OcrInstanceManager::new();
    /// assert_eq!(manager.instance_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create an OCR instance for the given configuration
    ///
    /// # Errors
    ///
    /// Returns `OcrError::Initialization` if Tesseract cannot be created
    /// (missing tessdata, unknown language) or rejects the page segmentation mode.
    pub fn get_instance(&self, config: &OcrConfig) -> Result<Arc<Mutex<LepTess>>, OcrError> {
        let key = Self::instance_key(&config.languages, config.model_type);

        if let Some(instance) = self.instances.lock().get(&key) {
            return Ok(Arc::clone(instance));
        }

        info!(
            "Creating new OCR instance for language: {} with model: {}",
            config.languages,
            config.model_type.tessdata_dir()
        );

        let tessdata_path = Self::get_tessdata_path(config.model_type);

        let mut tess = LepTess::new(tessdata_path.as_deref(), &config.languages).map_err(|e| {
            OcrError::Initialization(format!("Failed to initialize Tesseract OCR instance: {}", e))
        })?;

        tess.set_variable(
            leptess::Variable::TesseditPagesegMode,
            config.psm_mode.as_str(),
        )
        .map_err(|e| OcrError::Initialization(format!("Failed to set PSM mode: {}", e)))?;

        let instance = Arc::new(Mutex::new(tess));
        self.instances.lock().insert(key, Arc::clone(&instance));

        Ok(instance)
    }

    /// Get the tessdata path for the specified model type
    ///
    /// Falls back to Tesseract's compiled-in default when no model-specific
    /// directory is installed.
    fn get_tessdata_path(model_type: ModelType) -> Option<String> {
        if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
            if !prefix.trim().is_empty() {
                return Some(prefix);
            }
        }

        let possible_paths = match model_type {
            ModelType::Fast => [
                "/usr/share/tesseract-ocr/5/tessdata_fast",
                "/usr/share/tesseract-ocr/4.00/tessdata_fast",
                "/usr/share/tessdata_fast",
                "/usr/local/share/tessdata_fast",
            ],
            ModelType::Best => [
                "/usr/share/tesseract-ocr/5/tessdata_best",
                "/usr/share/tesseract-ocr/4.00/tessdata_best",
                "/usr/share/tessdata_best",
                "/usr/local/share/tessdata_best",
            ],
        };

        if let Some(path) = possible_paths
            .iter()
            .find(|path| std::path::Path::new(path).exists())
        {
            info!("Using tessdata path: {}", path);
            return Some(path.to_string());
        }

        info!(
            "No specific tessdata path found for model type {:?}, using default",
            model_type
        );
        None
    }

    /// Drop a cached instance, e.g. after it produced a corrupted result
    pub fn remove_instance(&self, languages: &str, model_type: ModelType) {
        let key = Self::instance_key(languages, model_type);
        if self.instances.lock().remove(&key).is_some() {
            info!(
                "Removed OCR instance for language: {} with model: {}",
                languages,
                model_type.tessdata_dir()
            );
        }
    }

    /// Get the number of cached instances
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    fn instance_key(languages: &str, model_type: ModelType) -> String {
        format!("{}:{}", languages, model_type.tessdata_dir())
    }
}

impl Default for OcrInstanceManager {
    fn default() -> Self {
        Self::new()
    }
}
