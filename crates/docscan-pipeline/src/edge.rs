//! Canny edge detection.
//!
//! Wraps [`imageproc::edges::canny`] to detect edges in a smoothed
//! grayscale image. Returns a binary image where white pixels (255) are
//! edges and black pixels (0) are background.

use image::GrayImage;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero marks every pixel with any gradient as a
/// potential edge, which floods the edge map.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge.
///
/// Both thresholds are clamped to a minimum of [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}

/// Number of edge pixels in a binary map.
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage) -> u64 {
    edges.pixels().map(|p| u64::from(p.0[0] > 0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 image with a sharp vertical boundary at x = 10.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn blank_image_produces_no_edges() {
        let img = GrayImage::from_pixel(20, 20, image::Luma([128]));
        let edges = canny(&img, 50.0, 150.0);
        assert_eq!(edges.dimensions(), (20, 20));
        assert_eq!(count_edge_pixels(&edges), 0);
    }

    #[test]
    fn sharp_edge_detected() {
        let edges = canny(&sharp_edge_image(), 50.0, 150.0);
        assert!(count_edge_pixels(&edges) > 0);
    }

    #[test]
    fn zero_low_threshold_is_clamped() {
        // A zero low threshold must behave like MIN_THRESHOLD.
        let img = sharp_edge_image();
        assert_eq!(canny(&img, 0.0, 84.0), canny(&img, MIN_THRESHOLD, 84.0));
    }

    #[test]
    fn inverted_thresholds_do_not_panic() {
        let edges = canny(&sharp_edge_image(), 200.0, 50.0);
        assert_eq!(edges.dimensions(), (20, 20));
    }

    #[test]
    fn output_dimensions_match_input() {
        let edges = canny(&GrayImage::new(17, 31), 50.0, 150.0);
        assert_eq!(edges.dimensions(), (17, 31));
    }
}
