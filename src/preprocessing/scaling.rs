//! # Image Scaling Module
//!
//! Fixed-factor upscaling. Receipts and invoices usually arrive at low native
//! resolution and thin fonts are recognised far better once enlarged.

use image::{DynamicImage, GenericImageView};

use super::types::ConditioningError;

/// Upscales `image` by `factor` in both dimensions with cubic interpolation.
///
/// The output is exactly `factor * width` by `factor * height`. Cubic
/// interpolation is Catmull-Rom, which keeps glyph edges crisp.
///
/// # Errors
///
/// Returns `ConditioningError::Processing` for a zero factor or when the
/// scaled dimensions would overflow `u32`.
pub fn upscale(image: &DynamicImage, factor: u32) -> Result<DynamicImage, ConditioningError> {
    if factor == 0 {
        return Err(ConditioningError::Processing {
            message: "upscale factor must be greater than 0".to_string(),
        });
    }

    let (width, height) = image.dimensions();
    let (new_width, new_height) = match (width.checked_mul(factor), height.checked_mul(factor)) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(ConditioningError::Processing {
                message: format!("{}x{} image cannot be scaled by {}", width, height, factor),
            })
        }
    };

    if factor == 1 {
        return Ok(image.clone());
    }

    Ok(image.resize_exact(
        new_width,
        new_height,
        image::imageops::FilterType::CatmullRom,
    ))
}
