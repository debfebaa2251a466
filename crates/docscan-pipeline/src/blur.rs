//! Smoothing before edge detection.
//!
//! [`gaussian_blur`] suppresses sensor noise; [`close`] then fills thin
//! dark gaps (text strokes, creases) so the page reads as one bright
//! region and Canny only fires on its outline.

use image::GrayImage;
use imageproc::morphology::{Mask, grayscale_close};

/// Apply Gaussian blur to a grayscale image.
///
/// Higher `sigma` values produce more smoothing. Non-positive sigma values
/// (zero or negative) return the image unchanged, since `imageproc`'s
/// underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Grayscale morphological close (dilate then erode) with a square of
/// side `2 * radius + 1`.
///
/// A radius of zero returns the image unchanged.
#[must_use = "returns the closed image"]
pub fn close(image: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }

    grayscale_close(image, &Mask::square(radius))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }

    #[test]
    fn negative_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur(&img, -1.0), img);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = GrayImage::new(17, 31);
        let blurred = gaussian_blur(&img, 1.4);
        assert_eq!(blurred.dimensions(), (17, 31));
        assert_eq!(close(&img, 4).dimensions(), (17, 31));
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let blurred = gaussian_blur(&sharp_edge_image(), 2.0);
        let left_of_edge = blurred.get_pixel(4, 5).0[0];
        let right_of_edge = blurred.get_pixel(5, 5).0[0];
        assert!(left_of_edge > 0, "got {left_of_edge}");
        assert!(right_of_edge < 255, "got {right_of_edge}");
    }

    #[test]
    fn uniform_image_unchanged_by_blur() {
        let img = GrayImage::from_pixel(10, 10, image::Luma([128]));
        for pixel in gaussian_blur(&img, 1.4).pixels() {
            let diff = i16::from(pixel.0[0]) - 128;
            assert!(diff.abs() <= 1, "got {}", pixel.0[0]);
        }
    }

    #[test]
    fn close_fills_thin_dark_line() {
        // Bright page crossed by a 2 px dark stroke.
        let img = GrayImage::from_fn(30, 30, |_x, y| {
            if (14..16).contains(&y) {
                image::Luma([0])
            } else {
                image::Luma([220])
            }
        });
        let closed = close(&img, 4);
        assert_eq!(closed.get_pixel(15, 14).0[0], 220);
        assert_eq!(closed.get_pixel(15, 15).0[0], 220);
    }

    #[test]
    fn close_radius_zero_is_identity() {
        let img = sharp_edge_image();
        assert_eq!(close(&img, 0), img);
    }
}
