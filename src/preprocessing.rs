//! # Image Conditioning Module
//!
//! This module turns a raw raster scan into a binary, text-thickened image
//! that Tesseract reads reliably.
//!
//! The module is organized into focused sub-modules:
//! - `scaling`: fixed-factor cubic upscaling
//! - `thresholding`: locally adaptive Gaussian binarization
//! - `filtering`: rectangular erosion that thickens dark strokes
//! - `conditioner`: the decode → persist pipeline tying the steps together
//! - `types`: shared types and error definitions

pub mod conditioner;
pub mod filtering;
pub mod scaling;
pub mod thresholding;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use types::{ConditionedImage, ConditioningError};

pub use conditioner::{condition, condition_image};
pub use filtering::erode_rect;
pub use scaling::upscale;
pub use thresholding::apply_adaptive_gaussian_threshold;
