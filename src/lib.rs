//! # docproc
//!
//! Extracts machine-readable text from a single document. Vector PDFs are read
//! through their embedded text layer; raster scans go through an image
//! conditioning and OCR pipeline that tries all four axis-aligned orientations
//! and keeps the most convincing reading.

pub mod artifacts;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod instance_manager;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod orientation;
pub mod pdf;
pub mod preprocessing;

// Re-export types for easier access
pub use dispatcher::{Dispatcher, ExtractionMethod, ExtractionOutcome, ExtractionStatus};
pub use orientation::{Confidence, Rotation, RotationAttempt, SearchOutcome};
