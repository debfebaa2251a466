//! Diagnostic drawings of intermediate results.
//!
//! Every function returns a fresh RGBA image; inputs are never modified.

use image::{DynamicImage, GrayImage, Rgba};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::corners::ReducedLine;
use crate::segmentation::BlockRect;
use crate::types::{LineSegment, Point, Quadrilateral, RgbaImage};

const RED: Rgba<u8> = Rgba([230, 40, 40, 255]);
const GREEN: Rgba<u8> = Rgba([40, 200, 60, 255]);
const BLUE: Rgba<u8> = Rgba([40, 90, 240, 255]);

const CORNER_RADIUS: i32 = 5;

/// RGBA copy of a grayscale image.
#[must_use]
pub fn gray_to_rgba(image: &GrayImage) -> RgbaImage {
    DynamicImage::ImageLuma8(image.clone()).into_rgba8()
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(p: Point) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Raw detected segments in red over `base`.
#[must_use]
pub fn draw_segments(base: &GrayImage, segments: &[LineSegment]) -> RgbaImage {
    let mut canvas = gray_to_rgba(base);
    for s in segments {
        draw_line_segment_mut(&mut canvas, to_f32(s.start), to_f32(s.end), RED);
    }
    canvas
}

/// Reduced lines in green and corner candidates as blue circles.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn draw_corners(base: &GrayImage, lines: &[ReducedLine], corners: &[Point]) -> RgbaImage {
    let mut canvas = gray_to_rgba(base);
    for line in lines {
        let s = line.segment;
        draw_line_segment_mut(&mut canvas, to_f32(s.start), to_f32(s.end), GREEN);
    }
    for c in corners {
        let center = (c.x.round() as i32, c.y.round() as i32);
        draw_hollow_circle_mut(&mut canvas, center, CORNER_RADIUS, BLUE);
    }
    canvas
}

/// Closed outline of `quad` in green, two pixels wide.
#[must_use]
pub fn draw_boundary(base: &RgbaImage, quad: &Quadrilateral) -> RgbaImage {
    let mut canvas = base.clone();
    let corners = quad.corners();
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        for offset in [0.0, 1.0] {
            let shift = |p: Point| to_f32(Point::new(p.x + offset, p.y + offset));
            draw_line_segment_mut(&mut canvas, shift(a), shift(b), GREEN);
        }
    }
    canvas
}

/// Text block rectangles in green over the page.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn draw_blocks(page: &GrayImage, blocks: &[BlockRect]) -> RgbaImage {
    let mut canvas = gray_to_rgba(page);
    for b in blocks {
        let rect = Rect::at(b.x as i32, b.y as i32).of_size(b.width.max(1), b.height.max(1));
        draw_hollow_rect_mut(&mut canvas, rect, GREEN);
    }
    canvas
}
