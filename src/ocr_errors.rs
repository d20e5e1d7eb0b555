//! # OCR Error Types Module
//!
//! This module defines the error types produced by OCR engine invocations.
//! The orientation search never propagates these; it records them on the
//! failed attempt instead.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// OCR engine initialization errors
    Initialization(String),
    /// Image loading errors
    ImageLoad(String),
    /// Text extraction errors
    Extraction(String),
    /// Timeout errors
    Timeout(String),
    /// The surrounding operation was cancelled before the engine finished
    Cancelled(String),
}

impl OcrError {
    /// Short machine-readable kind, used as a metrics label and in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            OcrError::Initialization(_) => "initialization",
            OcrError::ImageLoad(_) => "image_load",
            OcrError::Extraction(_) => "extraction",
            OcrError::Timeout(_) => "timeout",
            OcrError::Cancelled(_) => "cancelled",
        }
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Initialization(msg) => write!(f, "[OCR_INIT] OCR engine initialization failed: {}", msg),
            OcrError::ImageLoad(msg) => write!(f, "[IMAGE_LOAD] Failed to load image for OCR processing: {}", msg),
            OcrError::Extraction(msg) => write!(f, "[OCR_EXTRACT] Text extraction from image failed: {}", msg),
            OcrError::Timeout(msg) => write!(f, "[OCR_TIMEOUT] OCR processing timed out: {}", msg),
            OcrError::Cancelled(msg) => write!(f, "[OCR_CANCELLED] OCR processing cancelled: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}
