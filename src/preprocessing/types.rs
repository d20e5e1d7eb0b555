//! # Shared Types for Image Conditioning
//!
//! This module contains the error and result types shared by the
//! conditioning sub-modules.

use std::path::PathBuf;

/// Errors that can occur while conditioning an image for OCR.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditioningError {
    /// Input file missing, unreadable, empty or not a decodable image
    Decode { message: String },
    /// An image processing step rejected its input
    Processing { message: String },
    /// The conditioned image could not be written to the output directory
    Persist { message: String },
}

impl std::fmt::Display for ConditioningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditioningError::Decode { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ConditioningError::Processing { message } => {
                write!(f, "Image processing failed: {}", message)
            }
            ConditioningError::Persist { message } => {
                write!(f, "Failed to persist conditioned image: {}", message)
            }
        }
    }
}

impl std::error::Error for ConditioningError {}

/// A binarized, thickened image persisted for the orientation search.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedImage {
    /// Where the conditioned image was written
    pub path: PathBuf,
    /// Dimensions of the conditioned image (width, height)
    pub dimensions: (u32, u32),
    /// Dimensions of the decoded source image (width, height)
    pub source_dimensions: (u32, u32),
    /// Number of channels of the decoded source image
    pub source_channels: u8,
    /// Fraction of pixels that ended up as foreground (black)
    pub foreground_ratio: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
