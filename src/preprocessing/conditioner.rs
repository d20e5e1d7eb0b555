//! # Image Conditioner
//!
//! Turns an arbitrary scanned photo into a high-contrast binary image tuned
//! for OCR legibility: decode, upscale, grayscale, adaptive Gaussian
//! threshold, one erosion pass, persist.

use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb};
use tracing::{debug, info};

use super::filtering::erode_rect;
use super::scaling::upscale;
use super::thresholding::apply_adaptive_gaussian_threshold;
use super::types::{ConditionedImage, ConditioningError};
use crate::artifacts::ArtifactLayout;
use crate::errors::error_logging;
use crate::observability;
use crate::ocr_config::ConditioningConfig;

/// Conditions the image at `path` and writes the result to the layout's
/// conditioned image path, replacing any artifact left by a previous run.
///
/// # Errors
///
/// - `ConditioningError::Decode` if the file is missing, empty, too large,
///   over the pixel budget or not a decodable image
/// - `ConditioningError::Processing` if a processing step rejects the
///   configured tunables
/// - `ConditioningError::Persist` if the output directory or file cannot be written
///
/// # Examples
///
/// ```no_run
/// use docproc::artifacts::ArtifactLayout;
/// use docproc::ocr_config::ConditioningConfig;
/// use docproc::preprocessing::condition;
///
/// let layout = ArtifactLayout::new("output");
/// let conditioned = condition("receipt.jpg", &ConditioningConfig::default(), &layout)?;
/// println!("binary image at {}", conditioned.path.display());
/// # Ok::<(), docproc::preprocessing::ConditioningError>(())
/// ```
pub fn condition(
    path: impl AsRef<Path>,
    config: &ConditioningConfig,
    layout: &ArtifactLayout,
) -> Result<ConditionedImage, ConditioningError> {
    let path = path.as_ref();
    let span = observability::conditioning_span(&path.display().to_string());
    let _enter = span.enter();

    let start_time = std::time::Instant::now();
    info!("Conditioning image: {}", path.display());

    let raw = decode_image(path, config).inspect_err(|e| {
        error_logging::log_conditioning_error(
            e,
            "decode_image",
            Some(&path.display().to_string()),
            std::fs::metadata(path).map(|m| m.len()).ok(),
        );
    })?;

    let source_dimensions = raw.dimensions();
    let source_channels = raw.color().channel_count();

    let binary = condition_image(&raw, config)?;
    drop(raw);

    let foreground_ratio = foreground_ratio(&binary);
    let output_path = layout.conditioned_image_path();

    layout
        .ensure_output_dir()
        .map_err(|e| ConditioningError::Persist {
            message: format!(
                "cannot create output directory {}: {}",
                layout.output_dir().display(),
                e
            ),
        })?;
    binary
        .save(&output_path)
        .map_err(|e| ConditioningError::Persist {
            message: format!("cannot write {}: {}", output_path.display(), e),
        })?;

    let elapsed = start_time.elapsed();
    observability::record_conditioning_metrics(elapsed);

    info!(
        source_width = source_dimensions.0,
        source_height = source_dimensions.1,
        width = binary.width(),
        height = binary.height(),
        foreground_ratio = foreground_ratio,
        duration_ms = elapsed.as_millis() as u64,
        "Saved conditioned image to {}",
        output_path.display()
    );

    Ok(ConditionedImage {
        path: output_path,
        dimensions: binary.dimensions(),
        source_dimensions,
        source_channels,
        foreground_ratio,
        processing_time_ms: elapsed.as_millis() as u32,
    })
}

/// Runs the in-memory part of the pipeline: upscale, grayscale, threshold, erode.
pub fn condition_image(
    raw: &DynamicImage,
    config: &ConditioningConfig,
) -> Result<GrayImage, ConditioningError> {
    let upscaled = upscale(raw, config.upscale_factor)?;
    debug!(
        "Upscaled {}x{} -> {}x{}",
        raw.width(),
        raw.height(),
        upscaled.width(),
        upscaled.height()
    );

    let gray = to_grayscale(upscaled);
    let binary = apply_adaptive_gaussian_threshold(
        &gray,
        config.threshold_block_size,
        config.threshold_offset,
    )?;
    drop(gray);

    erode_rect(&binary, config.erosion_kernel_size, config.erosion_passes)
}

/// Single-channel input passes through untouched; colour is reduced with
/// BT.601 luma weights (0.299, 0.587, 0.114) in 14-bit fixed point, rounding
/// half up. Alpha is ignored.
fn to_grayscale(image: DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray,
        DynamicImage::ImageLumaA8(gray_alpha) => {
            GrayImage::from_fn(gray_alpha.width(), gray_alpha.height(), |x, y| {
                Luma([gray_alpha.get_pixel(x, y)[0]])
            })
        }
        other => {
            let rgb = other.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
                Luma([bt601_luma(r, g, b)])
            })
        }
    }
}

fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    const R_WEIGHT: u32 = 4899;
    const G_WEIGHT: u32 = 9617;
    const B_WEIGHT: u32 = 1868;
    const ROUND: u32 = 1 << 13;

    // Weights sum to 1 << 14, so the result never exceeds 255.
    ((r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT + ROUND) >> 14) as u8
}

/// Reads and decodes the input, detecting the format from the file content.
///
/// Dimensions are read from the header first so an oversized image is
/// rejected before any pixel buffer is allocated.
fn decode_image(path: &Path, config: &ConditioningConfig) -> Result<DynamicImage, ConditioningError> {
    let metadata = std::fs::metadata(path).map_err(|e| ConditioningError::Decode {
        message: format!("cannot access {}: {}", path.display(), e),
    })?;

    if !metadata.is_file() {
        return Err(ConditioningError::Decode {
            message: format!("path is not a file ({})", path.display()),
        });
    }
    if metadata.len() == 0 {
        return Err(ConditioningError::Decode {
            message: format!("file is empty ({})", path.display()),
        });
    }
    if metadata.len() > config.max_file_size {
        return Err(ConditioningError::Decode {
            message: format!(
                "file too large ({} bytes, maximum allowed: {} bytes)",
                metadata.len(),
                config.max_file_size
            ),
        });
    }

    let bytes = std::fs::read(path).map_err(|e| ConditioningError::Decode {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;

    let not_decodable = |e: &dyn std::fmt::Display| ConditioningError::Decode {
        message: format!("{} is not a decodable image: {}", path.display(), e),
    };

    let (width, height) = image::ImageReader::new(std::io::Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| not_decodable(&e))?
        .into_dimensions()
        .map_err(|e| not_decodable(&e))?;

    if width == 0 || height == 0 {
        return Err(ConditioningError::Decode {
            message: format!("image has no pixels ({})", path.display()),
        });
    }
    let pixels = width as u64 * height as u64;
    if pixels > config.max_source_pixels {
        return Err(ConditioningError::Decode {
            message: format!(
                "image too large ({}x{} = {} pixels, maximum allowed: {} pixels)",
                width, height, pixels, config.max_source_pixels
            ),
        });
    }

    image::load_from_memory(&bytes).map_err(|e| not_decodable(&e))
}

/// Fraction of pixels at the foreground (black) level.
fn foreground_ratio(binary: &GrayImage) -> f32 {
    let total = binary.width() as u64 * binary.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let histogram = imageproc::stats::histogram(binary);
    histogram.channels[0][0] as f32 / total as f32
}
