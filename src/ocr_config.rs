//! # OCR Configuration Module
//!
//! This module defines configuration structures for the raster extraction
//! pipeline: the OCR engine settings, the image conditioning tunables and the
//! orientation search policy.
//!
//! The conditioning and selection constants are empirical. Their defaults must
//! stay as they are for compatibility with existing OCR tuning.

use crate::errors::{AppError, AppResult};

// Constants for OCR configuration
pub const DEFAULT_LANGUAGES: &str = "eng";
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024; // 20MB limit for input images
pub const MAX_SOURCE_PIXELS: u64 = 12_000_000; // decoded pixels, before upscaling

// Conditioning defaults
pub const DEFAULT_UPSCALE_FACTOR: u32 = 3;
pub const DEFAULT_THRESHOLD_BLOCK_SIZE: u32 = 31;
pub const DEFAULT_THRESHOLD_OFFSET: i32 = 15;
pub const DEFAULT_EROSION_KERNEL_SIZE: u32 = 2;
pub const DEFAULT_EROSION_PASSES: u32 = 1;

// Selection defaults
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 20;

/// Page Segmentation Mode for Tesseract OCR
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    Auto = 3,
    /// Assume a single column of text (list-like receipts and invoices)
    #[default]
    SingleColumn = 4,
    /// Assume a single uniform block of text
    SingleBlock = 6,
    /// Find as much text as possible in no particular order
    SparseText = 11,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SparseText => "11",
        }
    }

    /// Parse a mode from its Tesseract number or its name (`single_column`, ...)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "3" | "auto" => Some(PageSegMode::Auto),
            "4" | "single_column" => Some(PageSegMode::SingleColumn),
            "6" | "single_block" => Some(PageSegMode::SingleBlock),
            "11" | "sparse_text" => Some(PageSegMode::SparseText),
            _ => None,
        }
    }
}

/// Tesseract model type for different accuracy/speed trade-offs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ModelType {
    /// Fast model (tessdata_fast) - faster processing, lower accuracy
    #[default]
    Fast,
    /// Best model (tessdata_best) - slower processing, higher accuracy
    Best,
}

impl ModelType {
    /// Get the tessdata directory name for this model type
    pub fn tessdata_dir(&self) -> &'static str {
        match self {
            ModelType::Fast => "tessdata_fast",
            ModelType::Best => "tessdata_best",
        }
    }

    /// Parse a model type from its configuration name (`fast` or `best`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fast" => Some(ModelType::Fast),
            "best" => Some(ModelType::Best),
            _ => None,
        }
    }
}

/// Configuration structure for the OCR engine
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// OCR language code passed to Tesseract (a single language, e.g. "eng")
    pub languages: String,
    /// Tesseract model type (Fast vs Best accuracy)
    pub model_type: ModelType,
    /// Page segmentation mode requested for every recognition
    pub psm_mode: PageSegMode,
    /// Per-attempt timeout for a single recognition, in seconds
    pub operation_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            model_type: ModelType::default(),
            psm_mode: PageSegMode::default(),
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        }
    }
}

impl OcrConfig {
    /// Validate OCR configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.languages.trim().is_empty() {
            return Err(AppError::Config("languages cannot be empty".to_string()));
        }
        if self.languages.contains('+') {
            return Err(AppError::Config(format!(
                "only a single OCR language is supported, got '{}'",
                self.languages
            )));
        }
        if self.operation_timeout_secs == 0 {
            return Err(AppError::Config(
                "operation_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-attempt timeout as a `Duration`
    pub fn operation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Tunables of the image conditioner
#[derive(Debug, Clone, PartialEq)]
pub struct ConditioningConfig {
    /// Integer upscale factor applied to both axes
    pub upscale_factor: u32,
    /// Side length of the square neighbourhood for the adaptive threshold (odd)
    pub threshold_block_size: u32,
    /// Constant subtracted from the local Gaussian mean
    pub threshold_offset: i32,
    /// Side length of the square erosion structuring element
    pub erosion_kernel_size: u32,
    /// Number of erosion passes; more than one fuses adjacent characters
    pub erosion_passes: u32,
    /// Maximum accepted input file size in bytes
    pub max_file_size: u64,
    /// Maximum decoded width × height accepted before upscaling
    pub max_source_pixels: u64,
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            upscale_factor: DEFAULT_UPSCALE_FACTOR,
            threshold_block_size: DEFAULT_THRESHOLD_BLOCK_SIZE,
            threshold_offset: DEFAULT_THRESHOLD_OFFSET,
            erosion_kernel_size: DEFAULT_EROSION_KERNEL_SIZE,
            erosion_passes: DEFAULT_EROSION_PASSES,
            max_file_size: MAX_FILE_SIZE,
            max_source_pixels: MAX_SOURCE_PIXELS,
        }
    }
}

impl ConditioningConfig {
    /// Validate conditioning parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.upscale_factor == 0 {
            return Err(AppError::Config(
                "upscale_factor must be greater than 0".to_string(),
            ));
        }
        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return Err(AppError::Config(format!(
                "threshold_block_size must be odd and >= 3, got {}",
                self.threshold_block_size
            )));
        }
        if !(0..=255).contains(&self.threshold_offset) {
            return Err(AppError::Config(format!(
                "threshold_offset must be within 0..=255, got {}",
                self.threshold_offset
            )));
        }
        if self.erosion_kernel_size == 0 {
            return Err(AppError::Config(
                "erosion_kernel_size must be greater than 0".to_string(),
            ));
        }
        if self.erosion_passes == 0 {
            return Err(AppError::Config(
                "erosion_passes must be greater than 0".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(AppError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }
        if self.max_source_pixels == 0 {
            return Err(AppError::Config(
                "max_source_pixels must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Selection policy for the orientation search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// A candidate must recognise strictly more characters than this to be selected
    pub min_text_length: usize,
    /// Skip OCR for the remaining rotations once the engine failed to initialise
    pub short_circuit_on_init_failure: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            short_circuit_on_init_failure: false,
        }
    }
}

impl SearchConfig {
    /// Validate search parameters
    pub fn validate(&self) -> AppResult<()> {
        // Zero is allowed: it only rejects empty recognitions.
        if self.min_text_length > 10_000 {
            return Err(AppError::Config(format!(
                "min_text_length is unreasonably large: {}",
                self.min_text_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_preserve_tuned_constants() {
        let conditioning = ConditioningConfig::default();
        assert_eq!(conditioning.upscale_factor, 3);
        assert_eq!(conditioning.threshold_block_size, 31);
        assert_eq!(conditioning.threshold_offset, 15);
        assert_eq!(conditioning.erosion_kernel_size, 2);
        assert_eq!(conditioning.erosion_passes, 1);

        assert_eq!(SearchConfig::default().min_text_length, 20);
        assert_eq!(OcrConfig::default().psm_mode, PageSegMode::SingleColumn);
        assert_eq!(OcrConfig::default().psm_mode.as_str(), "4");
    }

    #[test]
    #[allow(unused_assignments)]
    fn test_conditioning_config_validation() {
        let mut config = ConditioningConfig::default();
        assert!(config.validate().is_ok());

        config.upscale_factor = 0;
        assert!(config.validate().is_err());
        config.upscale_factor = 3;

        config.threshold_block_size = 30;
        assert!(config.validate().is_err());
        config.threshold_block_size = 1;
        assert!(config.validate().is_err());
        config.threshold_block_size = 31;

        config.threshold_offset = -1;
        assert!(config.validate().is_err());
        config.threshold_offset = 15;

        config.erosion_kernel_size = 0;
        assert!(config.validate().is_err());
        config.erosion_kernel_size = 2;

        config.erosion_passes = 0;
        assert!(config.validate().is_err());
        config.erosion_passes = 1;

        config.max_source_pixels = 0;
        assert!(config.validate().is_err());
        config.max_source_pixels = MAX_SOURCE_PIXELS;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ocr_config_validation() {
        let mut config = OcrConfig::default();
        assert!(config.validate().is_ok());

        config.languages = "eng+fra".to_string();
        assert!(config.validate().is_err());

        config.languages = "  ".to_string();
        assert!(config.validate().is_err());

        config.languages = "eng".to_string();
        config.operation_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_page_seg_mode_parse() {
        assert_eq!(PageSegMode::parse("4"), Some(PageSegMode::SingleColumn));
        assert_eq!(PageSegMode::parse(" Sparse-Text "), Some(PageSegMode::SparseText));
        assert_eq!(PageSegMode::parse("auto"), Some(PageSegMode::Auto));
        assert_eq!(PageSegMode::parse("6").map(|m| m.as_str()), Some("6"));
        assert_eq!(PageSegMode::parse("7"), None);
    }

    #[test]
    fn test_model_type_parse() {
        assert_eq!(ModelType::parse("fast"), Some(ModelType::Fast));
        assert_eq!(ModelType::parse(" BEST "), Some(ModelType::Best));
        assert_eq!(ModelType::parse("legacy"), None);
        assert_eq!(ModelType::Best.tessdata_dir(), "tessdata_best");
    }
}
