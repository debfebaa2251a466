//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP, TIFF) and produces the
//! decoded color image plus single-channel views of it. The color image
//! is kept because rectification warps the full-resolution original.

use image::{DynamicImage, GrayImage};

use crate::types::{RgbaImage, ScanError};

/// Decode raw image bytes.
///
/// # Errors
///
/// Returns [`ScanError::EmptyInput`] if `bytes` is empty.
/// Returns [`ScanError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded image"]
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ScanError> {
    if bytes.is_empty() {
        return Err(ScanError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Luminance of `image` (`0.299*R + 0.587*G + 0.114*B`).
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

/// RGBA copy of `image`.
#[must_use = "returns the RGBA image"]
pub fn to_rgba(image: &DynamicImage) -> RgbaImage {
    image.to_rgba8()
}
