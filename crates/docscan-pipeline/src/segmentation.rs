//! Text-block segmentation of a rectified page.
//!
//! Ink is separated from paper with Otsu's threshold, then smeared with a
//! wide, flat rectangle so that the letters of a paragraph fuse into one
//! blob. The bounding box of every outer blob is a block.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blur::gaussian_blur;
use crate::contour::{Contour, external_contours};
use crate::rectify::{integral_image, region_sum};

/// Tuning for [`segment_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Gaussian sigma applied before binarization.
    pub blur_sigma: f32,
    /// Horizontal half-width of the dilation rectangle.
    pub horizontal_radius: u32,
    /// Vertical half-height of the dilation rectangle.
    pub vertical_radius: u32,
}

impl SegmentationConfig {
    pub const DEFAULT_HORIZONTAL_RADIUS: u32 = 31;
    pub const DEFAULT_VERTICAL_RADIUS: u32 = 14;
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.5,
            horizontal_radius: Self::DEFAULT_HORIZONTAL_RADIUS,
            vertical_radius: Self::DEFAULT_VERTICAL_RADIUS,
        }
    }
}

/// Axis-aligned block bounds in page pixels (inclusive origin, exclusive
/// far edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BlockRect {
    /// Smallest rectangle containing every point of `contour`.
    ///
    /// Returns `None` for an empty contour.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bounding(contour: &Contour) -> Option<Self> {
        let points = contour.points();
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x) as u32 + 1,
            height: (max_y - min_y) as u32 + 1,
        })
    }
}

/// Dark-on-light page to white-on-black ink mask using Otsu's level.
#[must_use]
pub fn ink_mask(page: &GrayImage) -> GrayImage {
    let level = otsu_level(page);
    debug!(level, "otsu level");
    GrayImage::from_fn(page.width(), page.height(), |x, y| {
        if page.get_pixel(x, y).0[0] > level {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Binary dilation with a `(2 * rx + 1) x (2 * ry + 1)` rectangle.
#[must_use]
pub fn dilate_rect(mask: &GrayImage, rx: u32, ry: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let binary = GrayImage::from_fn(width, height, |x, y| {
        Luma([u8::from(mask.get_pixel(x, y).0[0] > 0)])
    });
    let table = integral_image(&binary);
    GrayImage::from_fn(width, height, |x, y| {
        let x0 = x.saturating_sub(rx);
        let y0 = y.saturating_sub(ry);
        let x1 = x.saturating_add(rx).saturating_add(1).min(width);
        let y1 = y.saturating_add(ry).saturating_add(1).min(height);
        if region_sum(&table, width, x0, y0, x1, y1) > 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Text blocks of a page, in reading order (top to bottom, then left to
/// right).
#[must_use]
pub fn segment_blocks(page: &GrayImage, config: &SegmentationConfig) -> Vec<BlockRect> {
    let blurred = gaussian_blur(page, config.blur_sigma);
    let ink = ink_mask(&blurred);
    let smeared = dilate_rect(&ink, config.horizontal_radius, config.vertical_radius);

    let mut blocks: Vec<BlockRect> = external_contours(&smeared)
        .iter()
        .filter_map(BlockRect::bounding)
        .collect();
    blocks.sort_by_key(|b| (b.y, b.x));
    debug!(blocks = blocks.len(), "text blocks");
    blocks
}

/// Copy every block out of `page`. Blocks are clipped to the page.
#[must_use]
pub fn crop_blocks(page: &GrayImage, blocks: &[BlockRect]) -> Vec<GrayImage> {
    blocks
        .iter()
        .map(|b| image::imageops::crop_imm(page, b.x, b.y, b.width, b.height).to_image())
        .collect()
}
