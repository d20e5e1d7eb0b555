//! # Image Filtering Module
//!
//! Morphological stroke thickening for binary OCR input.
//!
//! Text is dark on a light background, so eroding the light pixels (taking the
//! neighbourhood minimum) grows every dark stroke by the kernel size minus one.
//! This reconnects the broken strokes of thin thermal-printer fonts.

use image::{GrayImage, Luma};

use super::types::ConditioningError;

/// Erodes `image` with a `kernel_size` x `kernel_size` rectangular element.
///
/// The anchor sits at `kernel_size / 2`, so a 2x2 element covers the pixel
/// itself plus its left, upper and upper-left neighbours. Neighbours outside
/// the image are ignored rather than padded.
///
/// # Arguments
///
/// * `image` - Binary (or grayscale) input image
/// * `kernel_size` - Side length of the structuring element
/// * `passes` - How many times to apply the erosion
///
/// # Errors
///
/// Returns `ConditioningError::Processing` if the kernel size or pass count is zero.
pub fn erode_rect(
    image: &GrayImage,
    kernel_size: u32,
    passes: u32,
) -> Result<GrayImage, ConditioningError> {
    if kernel_size == 0 {
        return Err(ConditioningError::Processing {
            message: "erosion kernel size must be greater than 0".to_string(),
        });
    }
    if passes == 0 {
        return Err(ConditioningError::Processing {
            message: "erosion passes must be greater than 0".to_string(),
        });
    }

    let start_time = std::time::Instant::now();

    let mut result = image.clone();
    for _ in 0..passes {
        // A rectangle is separable: row minimum, then column minimum.
        let horizontal = min_filter(&result, kernel_size, Axis::Horizontal);
        result = min_filter(&horizontal, kernel_size, Axis::Vertical);
    }

    tracing::debug!(
        target: "ocr_preprocessing",
        "Erosion completed in {}ms: kernel={}x{}, passes={}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        kernel_size,
        kernel_size,
        passes,
        result.width(),
        result.height()
    );

    Ok(result)
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// One-dimensional minimum filter along `axis` with the anchor at `size / 2`.
fn min_filter(image: &GrayImage, size: u32, axis: Axis) -> GrayImage {
    let (width, height) = image.dimensions();
    let anchor = (size / 2) as i64;
    let before = anchor;
    let after = size as i64 - 1 - anchor;

    let mut result = GrayImage::new(width, height);

    for (x, y, pixel) in result.enumerate_pixels_mut() {
        let (pos, limit) = match axis {
            Axis::Horizontal => (x as i64, width as i64),
            Axis::Vertical => (y as i64, height as i64),
        };

        let start = (pos - before).max(0);
        let end = (pos + after).min(limit - 1);

        let min_val = (start..=end)
            .map(|p| match axis {
                Axis::Horizontal => image.get_pixel(p as u32, y)[0],
                Axis::Vertical => image.get_pixel(x, p as u32)[0],
            })
            .min()
            .unwrap_or(255);

        *pixel = Luma([min_val]);
    }

    result
}
