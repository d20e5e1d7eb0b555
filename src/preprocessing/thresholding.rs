//! # Image Thresholding Module
//!
//! Locally adaptive binarization. Each pixel is compared against the
//! Gaussian-weighted mean of its square neighbourhood minus a constant, which
//! copes with the uneven lighting of photographed paper where a single global
//! threshold leaves shadow blotches.
//!
//! The arithmetic mirrors the classic `ADAPTIVE_THRESH_GAUSSIAN_C` /
//! `THRESH_BINARY` combination so that existing tuning carries over:
//!
//! ```text
//! sigma = 0.3 * ((block - 1) / 2 - 1) + 0.8
//! mean  = round(gaussian_blur(src, block, sigma))   // replicate border
//! dst   = 255 if src - mean > -offset else 0
//! ```

use std::collections::VecDeque;

use image::{GrayImage, Luma};

use super::types::ConditioningError;

/// Sigma used for a Gaussian window of `block_size` when none is given explicitly.
pub fn gaussian_sigma(block_size: u32) -> f64 {
    0.3 * ((block_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Builds the normalized 1-D Gaussian kernel for a window of `block_size`.
///
/// The weights sum to 1.
pub fn gaussian_kernel(block_size: u32) -> Vec<f32> {
    let sigma = gaussian_sigma(block_size);
    let center = (block_size as f64 - 1.0) * 0.5;
    let scale = -0.5 / (sigma * sigma);

    let raw: Vec<f64> = (0..block_size)
        .map(|i| {
            let x = i as f64 - center;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();

    raw.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Applies the adaptive Gaussian threshold to a grayscale image.
///
/// Returns a strictly binary image: every pixel is either 0 or 255.
///
/// # Arguments
///
/// * `gray` - Single-channel input image
/// * `block_size` - Odd side length of the neighbourhood (31 for receipts)
/// * `offset` - Constant subtracted from the local mean (15 for receipts)
///
/// # Errors
///
/// Returns `ConditioningError::Processing` when `block_size` is even or
/// smaller than 3, or when the image is empty.
pub fn apply_adaptive_gaussian_threshold(
    gray: &GrayImage,
    block_size: u32,
    offset: i32,
) -> Result<GrayImage, ConditioningError> {
    if block_size < 3 || block_size % 2 == 0 {
        return Err(ConditioningError::Processing {
            message: format!("block size must be odd and >= 3, got {}", block_size),
        });
    }

    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(ConditioningError::Processing {
            message: "cannot threshold an empty image".to_string(),
        });
    }

    let start_time = std::time::Instant::now();
    let kernel = gaussian_kernel(block_size);
    let radius = (block_size / 2) as i64;
    let last_row = height as i64 - 1;

    let mut binary = GrayImage::new(width, height);

    // Horizontally blurred rows currently inside the vertical window.
    let mut window: VecDeque<Vec<f32>> = VecDeque::with_capacity(block_size as usize);
    let mut window_start: i64 = 0;

    for y in 0..height as i64 {
        let needed_end = (y + radius).min(last_row);
        while window_start + window.len() as i64 <= needed_end {
            let next_row = window_start + window.len() as i64;
            window.push_back(blur_row(gray, next_row as u32, &kernel));
        }

        let needed_start = (y - radius).max(0);
        while window_start < needed_start {
            window.pop_front();
            window_start += 1;
        }

        for x in 0..width as usize {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let row = (y + k as i64 - radius).clamp(0, last_row);
                acc += weight * window[(row - window_start) as usize][x];
            }

            let mean = acc.round().clamp(0.0, 255.0) as i32;
            let src = gray.get_pixel(x as u32, y as u32)[0] as i32;
            let value = if src - mean > -offset { 255u8 } else { 0u8 };
            binary.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }

    tracing::debug!(
        target: "ocr_preprocessing",
        "Adaptive Gaussian threshold completed in {}ms: block={}, offset={}, dimensions={}x{}",
        start_time.elapsed().as_millis(),
        block_size,
        offset,
        width,
        height
    );

    Ok(binary)
}

/// Convolves one row with `kernel`, replicating edge pixels.
fn blur_row(gray: &GrayImage, y: u32, kernel: &[f32]) -> Vec<f32> {
    let width = gray.width() as i64;
    let radius = (kernel.len() / 2) as i64;

    (0..width)
        .map(|x| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sx = (x + k as i64 - radius).clamp(0, width - 1);
                    weight * gray.get_pixel(sx as u32, y)[0] as f32
                })
                .sum()
        })
        .collect()
}
