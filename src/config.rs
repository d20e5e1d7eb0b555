//! # Unified Application Configuration
//!
//! This module gathers every tunable of the extraction pipeline into a single
//! configuration object. Values come from environment variables (optionally
//! provided through a `.env` file) and fall back to the tuned defaults.

use crate::artifacts::{ArtifactLayout, DEFAULT_OUTPUT_DIR};
use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::{ConditioningConfig, ModelType, OcrConfig, PageSegMode, SearchConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory receiving the conditioned and per-rotation images
    pub output_dir: PathBuf,
    /// OCR engine configuration
    pub ocr: OcrConfig,
    /// Image conditioning configuration
    pub conditioning: ConditioningConfig,
    /// Orientation search configuration
    pub search: SearchConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `.env` first when present. Unset variables keep their defaults;
    /// set but malformed variables are an error.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(dir) = env::var("DOCPROC_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        // Load OCR configuration
        if let Ok(languages) = env::var("OCR_LANGUAGES") {
            config.ocr.languages = languages;
        }
        if let Ok(model) = env::var("OCR_MODEL_TYPE") {
            config.ocr.model_type = ModelType::parse(&model).ok_or_else(|| {
                AppError::Config(format!(
                    "OCR_MODEL_TYPE must be 'fast' or 'best', got '{}'",
                    model
                ))
            })?;
        }
        if let Ok(psm) = env::var("OCR_PSM_MODE") {
            config.ocr.psm_mode = parse_psm_mode(&psm)?;
        }
        config.ocr.operation_timeout_secs =
            parse_var("OCR_TIMEOUT_SECS", config.ocr.operation_timeout_secs)?;

        // Load conditioning configuration
        config.conditioning.max_source_pixels = parse_var(
            "DOCPROC_MAX_SOURCE_PIXELS",
            config.conditioning.max_source_pixels,
        )?;

        // Load search configuration
        config.search.min_text_length =
            parse_var("OCR_MIN_TEXT_LENGTH", config.search.min_text_length)?;
        config.search.short_circuit_on_init_failure = parse_var(
            "OCR_SHORT_CIRCUIT_ON_INIT_FAILURE",
            config.search.short_circuit_on_init_failure,
        )?;

        // Load observability configuration
        config.observability = ObservabilityConfig::from_env()?;

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Output directory cannot be empty".to_string()));
        }
        self.ocr.validate()?;
        self.conditioning.validate()?;
        self.search.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Artifact layout rooted at the configured output directory
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(self.output_dir.clone())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: output_dir={}, ocr_languages={}, model={}, psm={}, timeout={}s, min_text_length={}, short_circuit={}, log_level={}",
            self.output_dir.display(),
            self.ocr.languages,
            self.ocr.model_type.tessdata_dir(),
            self.ocr.psm_mode.as_str(),
            self.ocr.operation_timeout_secs,
            self.search.min_text_length,
            self.search.short_circuit_on_init_failure,
            self.observability.log_level
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            ocr: OcrConfig::default(),
            conditioning: ConditioningConfig::default(),
            search: SearchConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn parse_psm_mode(raw: &str) -> AppResult<PageSegMode> {
    PageSegMode::parse(raw).ok_or_else(|| {
        AppError::Config(format!(
            "OCR_PSM_MODE must be one of 3/auto, 4/single_column, 6/single_block, 11/sparse_text, got '{}'",
            raw
        ))
    })
}

/// Parse an optional environment variable, keeping `default` when unset
fn parse_var<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().to_lowercase().parse().map_err(|_| {
            AppError::Config(format!("{} has an invalid value: '{}'", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.layout().conditioned_image_path(),
            PathBuf::from("output/temp_processed.png")
        );
    }

    #[test]
    fn test_validation_propagates_section_errors() {
        let mut config = AppConfig::default();
        config.conditioning.threshold_block_size = 30;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.ocr.operation_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig {
            output_dir: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.output_dir = PathBuf::from("scratch");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_var_defaults_when_unset() {
        let value: u64 = parse_var("DOCPROC_TEST_SURELY_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_summary_mentions_key_settings() {
        let summary = AppConfig::default().summary();
        assert!(summary.contains("output_dir=output"));
        assert!(summary.contains("ocr_languages=eng"));
        assert!(summary.contains("min_text_length=20"));
        assert!(summary.contains("psm=4"));
    }

    #[test]
    fn test_psm_mode_from_name_or_number() {
        assert_eq!(parse_psm_mode("single_block").unwrap(), PageSegMode::SingleBlock);
        assert_eq!(parse_psm_mode("11").unwrap(), PageSegMode::SparseText);
        match parse_psm_mode("13") {
            Err(AppError::Config(msg)) => assert!(msg.contains("OCR_PSM_MODE")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
