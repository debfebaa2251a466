//! Resizing to the fixed working height.
//!
//! Boundary detection runs on a copy whose height is
//! `working_height` pixels, which keeps every threshold in the engine
//! resolution independent. The returned ratio maps working coordinates
//! back onto the original image.

use image::DynamicImage;
use image::imageops::FilterType;

/// A resized image and the factor that maps its coordinates back to the
/// source.
#[derive(Debug, Clone)]
pub struct Resized {
    /// The working-size image.
    pub image: DynamicImage,
    /// `original height / working height`.
    pub ratio: f64,
}

/// Resize `image` so its height is exactly `working_height`, keeping the
/// aspect ratio.
///
/// Images of that height are returned unchanged with a ratio of 1.
/// Smaller images are scaled up. A zero-height image or target is
/// returned unchanged.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_working_height(image: &DynamicImage, working_height: u32) -> Resized {
    let (w, h) = (image.width(), image.height());
    if h == 0 || working_height == 0 || h == working_height {
        return Resized {
            image: image.clone(),
            ratio: 1.0,
        };
    }

    let ratio = f64::from(h) / f64::from(working_height);
    let width = (f64::from(w) / ratio).round().max(1.0) as u32;
    Resized {
        image: image.resize_exact(width, working_height, FilterType::Triangle),
        ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            w,
            h,
            image::Rgba([128, 128, 128, 255]),
        ))
    }

    #[test]
    fn portrait_is_reduced_to_working_height() {
        let resized = to_working_height(&test_image(600, 1200), 500);
        assert_eq!(resized.image.height(), 500);
        assert_eq!(resized.image.width(), 250);
        assert!((resized.ratio - 2.4).abs() < 1e-12);
    }

    #[test]
    fn landscape_keeps_aspect_ratio() {
        let resized = to_working_height(&test_image(1024, 768), 500);
        assert_eq!(resized.image.height(), 500);
        // 1024 * 500 / 768 = 666.67
        assert_eq!(resized.image.width(), 667);
    }

    #[test]
    fn exact_height_is_untouched() {
        let resized = to_working_height(&test_image(300, 500), 500);
        assert_eq!((resized.image.width(), resized.image.height()), (300, 500));
        assert!((resized.ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn small_image_is_scaled_up() {
        let resized = to_working_height(&test_image(100, 250), 500);
        assert_eq!((resized.image.width(), resized.image.height()), (200, 500));
        assert!((resized.ratio - 0.5).abs() < f64::EPSILON);
    }
}
