//! Perspective correction and scan-style enhancement.
//!
//! [`four_point_transform`] maps the selected quadrilateral of the
//! full-resolution original onto an upright rectangle. [`enhance`] then
//! produces the black-on-white look of a flatbed scan: an unsharp mask
//! followed by a local-mean adaptive threshold.

use image::{GrayImage, Luma, Rgba};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::debug;

use crate::types::{Quadrilateral, RgbaImage, ScanError};

/// Output size for a quadrilateral: the longer of each pair of opposite
/// edges, truncated to whole pixels.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn target_size(quad: &Quadrilateral) -> (u32, u32) {
    let width = quad
        .bottom_right()
        .distance(quad.bottom_left())
        .max(quad.top_right().distance(quad.top_left()));
    let height = quad
        .top_right()
        .distance(quad.bottom_right())
        .max(quad.top_left().distance(quad.bottom_left()));
    (width as u32, height as u32)
}

/// Warp the region of `image` bounded by `quad` into an upright
/// rectangle of [`target_size`].
///
/// Pixels mapped from outside the source are white.
///
/// # Errors
///
/// Returns [`ScanError::Rectification`] if the quadrilateral collapses
/// to less than one pixel or no projective transform exists for it.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn four_point_transform(image: &RgbaImage, quad: &Quadrilateral) -> Result<RgbaImage, ScanError> {
    let (width, height) = target_size(quad);
    if width < 2 || height < 2 {
        return Err(ScanError::Rectification(format!(
            "quadrilateral too small to rectify ({width}x{height})"
        )));
    }

    let src = quad.corners().map(|p| (p.x as f32, p.y as f32));
    let (right, bottom) = ((width - 1) as f32, (height - 1) as f32);
    let dest = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

    let projection = Projection::from_control_points(src, dest).ok_or_else(|| {
        ScanError::Rectification("no projective transform for quadrilateral".to_owned())
    })?;

    let mut output = RgbaImage::new(width, height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgba([255, 255, 255, 255]),
        &mut output,
    );
    debug!(width, height, "perspective warp applied");
    Ok(output)
}

/// Unsharp mask: `1.5 * image - 0.5 * blur(image, sigma)`, saturated.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sharpen(image: &GrayImage, sigma: f32) -> GrayImage {
    let blurred = crate::blur::gaussian_blur(image, sigma);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let original = f32::from(image.get_pixel(x, y).0[0]);
        let smooth = f32::from(blurred.get_pixel(x, y).0[0]);
        let value = 1.5f32.mul_add(original, -0.5 * smooth);
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Binarize against the mean of the `(2 * radius + 1)` square around
/// each pixel: brighter than `mean - offset` becomes white, everything
/// else black.
///
/// The window is clipped at the image border.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn adaptive_threshold(image: &GrayImage, radius: u32, offset: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    let integral = integral_image(image);
    let offset = f64::from(offset);

    GrayImage::from_fn(width, height, |x, y| {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = x.saturating_add(radius).saturating_add(1).min(width);
        let y1 = y.saturating_add(radius).saturating_add(1).min(height);
        let sum = region_sum(&integral, width, x0, y0, x1, y1);
        let count = u64::from(x1 - x0) * u64::from(y1 - y0);
        let mean = sum as f64 / count as f64;
        if f64::from(image.get_pixel(x, y).0[0]) > mean - offset {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Sharpen then binarize a rectified page.
#[must_use]
pub fn enhance(image: &GrayImage, sharpen_sigma: f32, radius: u32, offset: i32) -> GrayImage {
    adaptive_threshold(&sharpen(image, sharpen_sigma), radius, offset)
}

/// Summed-area table with a zero row and column in front:
/// `table[y * (w + 1) + x]` is the sum over `[0, x) x [0, y)`.
pub(crate) fn integral_image(image: &GrayImage) -> Vec<u64> {
    let (w, h) = image.dimensions();
    let stride = w as usize + 1;
    let mut table = vec![0u64; stride * (h as usize + 1)];

    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            #[allow(clippy::cast_possible_truncation)]
            let pixel = image.get_pixel(x as u32, y as u32).0[0];
            row_sum += u64::from(pixel);
            table[(y + 1) * stride + x + 1] = row_sum + table[y * stride + x + 1];
        }
    }
    table
}

/// Sum over `[x0, x1) x [y0, y1)`.
pub(crate) fn region_sum(table: &[u64], width: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
    let stride = width as usize + 1;
    let at = |x: u32, y: u32| table[y as usize * stride + x as usize];
    at(x1, y1) + at(x0, y0) - at(x0, y1) - at(x1, y0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Dimensions, Point};

    fn quad(points: [(f64, f64); 4]) -> Quadrilateral {
        Quadrilateral::from_points(points.map(|(x, y)| Point::new(x, y)))
    }

    /// Black canvas with a white square over [20, 80) on both axes.
    fn white_square() -> RgbaImage {
        RgbaImage::from_fn(100, 100, |x, y| {
            if (20..80).contains(&x) && (20..80).contains(&y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn target_size_uses_longer_edges() {
        let q = quad([(0.0, 0.0), (100.0, 0.0), (90.0, 50.0), (10.0, 60.0)]);
        let (w, h) = target_size(&q);
        assert_eq!(w, 100);
        assert_eq!(h, 60);
    }

    #[test]
    fn full_frame_keeps_dimensions() {
        let img = white_square();
        let frame = Quadrilateral::frame(Dimensions::of(&img));
        let out = four_point_transform(&img, &frame).unwrap();
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(out.get_pixel(50, 50).0[0], 255);
        assert_eq!(out.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn crop_of_white_square_is_white() {
        let img = white_square();
        let q = quad([(25.0, 25.0), (75.0, 25.0), (75.0, 75.0), (25.0, 75.0)]);
        let out = four_point_transform(&img, &q).unwrap();
        assert_eq!(out.dimensions(), (50, 50));
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn collapsed_quad_is_an_error() {
        let p = Point::new(10.0, 10.0);
        let q = Quadrilateral::from_points([p, p, p, p]);
        assert!(matches!(
            four_point_transform(&white_square(), &q),
            Err(ScanError::Rectification(_))
        ));
    }

    #[test]
    fn sharpen_keeps_uniform_and_boosts_edges() {
        let flat = GrayImage::from_pixel(20, 20, Luma([100]));
        assert!(sharpen(&flat, 3.0).pixels().all(|p| p.0[0].abs_diff(100) <= 1));

        let step = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([60]) } else { Luma([180]) });
        let sharp = sharpen(&step, 3.0);
        assert!(sharp.get_pixel(9, 10).0[0] < 60);
        assert!(sharp.get_pixel(10, 10).0[0] > 180);
    }

    #[test]
    fn threshold_whitens_flat_page_and_keeps_ink() {
        let mut page = GrayImage::from_pixel(40, 40, Luma([200]));
        for x in 10..30 {
            page.put_pixel(x, 20, Luma([30]));
        }
        let binary = adaptive_threshold(&page, 10, 15);
        assert_eq!(binary.get_pixel(2, 2).0[0], 255);
        assert_eq!(binary.get_pixel(20, 20).0[0], 0);
        assert_eq!(binary.get_pixel(20, 5).0[0], 255);
    }

    #[test]
    fn region_sum_matches_direct_sum() {
        let img = GrayImage::from_fn(7, 5, |x, y| Luma([u8::try_from(x * 10 + y).unwrap()]));
        let table = integral_image(&img);
        let direct: u64 = (2..6)
            .flat_map(|x| (1..4).map(move |y| (x, y)))
            .map(|(x, y)| u64::from(img.get_pixel(x, y).0[0]))
            .sum();
        assert_eq!(region_sum(&table, 7, 2, 1, 6, 4), direct);
    }

    #[test]
    fn enhance_output_is_binary() {
        let img = GrayImage::from_fn(30, 30, |x, y| Luma([u8::try_from((x * 7 + y * 3) % 256).unwrap()]));
        assert!(enhance(&img, 3.0, 10, 15).pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }
}
