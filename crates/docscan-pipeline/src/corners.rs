//! Corner candidates from fragmented line segments.
//!
//! Segment detectors return many short, duplicated pieces for every
//! physical document edge. This module recovers at most a couple of
//! lines per orientation and turns them into corner candidates:
//!
//! 1. Split segments into horizontal and vertical.
//! 2. Draw each group, slightly lengthened and thickened, onto its own
//!    canvas so neighbouring fragments fuse into one component.
//! 3. Keep the components with the longest outline per orientation.
//! 4. Collapse each component into a single line between its (trimmed)
//!    extremes along the dominant axis. Both endpoints are corners.
//! 5. Redraw the reduced lines; pixels where a horizontal and a vertical
//!    line cross are corners too.
//! 6. Drop corners that sit too close to an earlier one.
//!
//! Endpoints and crossings get equal weight: which of them is the real
//! corner depends on whether the adjoining edge was fully detected.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;
use tracing::debug;

use crate::contour::{Contour, ContourTracer, ContourTracerKind};
use crate::geometry::filter_close_points;
use crate::types::{BoundaryConfig, Dimensions, LineReduction, LineSegment, Orientation, Point};

/// A line recovered from a merged group of segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducedLine {
    /// Group the line was reduced from.
    pub orientation: Orientation,
    /// Endpoints, ordered along the dominant axis.
    pub segment: LineSegment,
}

/// Output of [`extract_corners`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CornerExtraction {
    /// De-duplicated corner candidates, in discovery order.
    pub corners: Vec<Point>,
    /// Reduced lines, horizontal group first.
    pub lines: Vec<ReducedLine>,
}

/// Derive corner candidates from raw segments detected on an edge map of
/// size `dimensions`.
///
/// No segments (or an empty frame) yields an empty extraction.
#[must_use]
pub fn extract_corners(
    segments: &[LineSegment],
    dimensions: Dimensions,
    config: &BoundaryConfig,
) -> CornerExtraction {
    if segments.is_empty() || dimensions.width == 0 || dimensions.height == 0 {
        return CornerExtraction::default();
    }

    let reduction = &config.lines;
    let (horizontal, vertical): (Vec<LineSegment>, Vec<LineSegment>) = segments
        .iter()
        .map(|s| s.canonicalized())
        .partition(|s| s.orientation() == Orientation::Horizontal);

    let mut corners = Vec::new();
    let mut lines = Vec::new();

    for (orientation, group) in [
        (Orientation::Horizontal, &horizontal),
        (Orientation::Vertical, &vertical),
    ] {
        if group.is_empty() {
            continue;
        }
        let canvas = merge_canvas(group, orientation, dimensions, reduction);

        let mut components = ContourTracerKind::External.trace(&canvas);
        components.sort_by(|a, b| b.perimeter().total_cmp(&a.perimeter()));
        components.truncate(reduction.per_orientation);

        for component in &components {
            let Some(segment) = reduce_component(component, orientation, reduction.trim) else {
                debug!(?orientation, "skipping component with empty trimmed extreme");
                continue;
            };
            corners.push(segment.start);
            corners.push(segment.end);
            lines.push(ReducedLine {
                orientation,
                segment,
            });
        }
    }

    let crossings = line_crossings(&lines, dimensions);
    let raw_count = corners.len() + crossings.len();
    corners.extend(crossings);
    let corners = filter_close_points(&corners, config.min_corner_distance);

    debug!(
        segments = segments.len(),
        horizontal = horizontal.len(),
        vertical = vertical.len(),
        lines = lines.len(),
        raw_corners = raw_count,
        corners = corners.len(),
        "corner extraction complete"
    );

    CornerExtraction { corners, lines }
}

/// Draw every segment of one orientation, lengthened by
/// `reduction.extension` at both ends and `reduction.thickness` wide.
#[allow(clippy::cast_possible_truncation)]
fn merge_canvas(
    segments: &[LineSegment],
    orientation: Orientation,
    dimensions: Dimensions,
    reduction: &LineReduction,
) -> GrayImage {
    let mut canvas = GrayImage::new(dimensions.width, dimensions.height);
    let ext = f64::from(reduction.extension);
    let max_x = f64::from(dimensions.width - 1);
    let max_y = f64::from(dimensions.height - 1);

    for segment in segments {
        let (x1, y1) = (segment.start.x.trunc(), segment.start.y.trunc());
        let (x2, y2) = (segment.end.x.trunc(), segment.end.y.trunc());
        let (start, end) = match orientation {
            Orientation::Horizontal => (
                Point::new((x1 - ext).max(0.0), y1),
                Point::new((x2 + ext).min(max_x), y2),
            ),
            Orientation::Vertical => (
                Point::new(x1, (y1 - ext).max(0.0)),
                Point::new(x2, (y2 + ext).min(max_y)),
            ),
        };
        draw_thick(&mut canvas, start, end, orientation, reduction.thickness, 255);
    }

    canvas
}

/// Draw a line `thickness` pixels wide by stacking one-pixel lines
/// across the dominant axis.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn draw_thick(
    canvas: &mut GrayImage,
    start: Point,
    end: Point,
    orientation: Orientation,
    thickness: u32,
    value: u8,
) {
    let half = thickness / 2;
    for k in 0..thickness.max(1) {
        let offset = f64::from(k) - f64::from(half);
        let (dx, dy) = match orientation {
            Orientation::Horizontal => (0.0, offset),
            Orientation::Vertical => (offset, 0.0),
        };
        draw_line_segment_mut(
            canvas,
            ((start.x + dx) as f32, (start.y + dy) as f32),
            ((end.x + dx) as f32, (end.y + dy) as f32),
            Luma([value]),
        );
    }
}

/// Collapse a merged component into one line between its extremes along
/// the dominant axis, pulled in by `trim` pixels. The cross-axis position
/// at each end is the truncated mean of the outline points there.
#[allow(clippy::float_cmp)]
fn reduce_component(
    component: &Contour,
    orientation: Orientation,
    trim: u32,
) -> Option<LineSegment> {
    let split = |p: Point| match orientation {
        Orientation::Horizontal => (p.x, p.y),
        Orientation::Vertical => (p.y, p.x),
    };
    let join = |along: f64, across: f64| match orientation {
        Orientation::Horizontal => Point::new(along, across),
        Orientation::Vertical => Point::new(across, along),
    };

    let points = component.points();
    let (min, max) = points
        .iter()
        .map(|&p| split(p).0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let trim = f64::from(trim);
    let (lo, hi) = (min + trim, max - trim);
    if lo > hi {
        return None;
    }

    // Outline coordinates are integral, so exact comparison is sound.
    let mean_across = |at: f64| {
        let (sum, count) = points
            .iter()
            .map(|&p| split(p))
            .filter(|&(along, _)| along == at)
            .fold((0.0, 0_u32), |(sum, n), (_, across)| (sum + across, n + 1));
        (count > 0).then(|| (sum / f64::from(count)).trunc())
    };

    let start = join(lo, mean_across(lo)?);
    let end = join(hi, mean_across(hi)?);
    Some(LineSegment::new(start, end, 1.0))
}

/// Pixels covered by both a horizontal and a vertical reduced line,
/// in row-major order.
fn line_crossings(lines: &[ReducedLine], dimensions: Dimensions) -> Vec<Point> {
    let mut horizontal = GrayImage::new(dimensions.width, dimensions.height);
    let mut vertical = GrayImage::new(dimensions.width, dimensions.height);
    for line in lines {
        let canvas = match line.orientation {
            Orientation::Horizontal => &mut horizontal,
            Orientation::Vertical => &mut vertical,
        };
        draw_thick(
            canvas,
            line.segment.start,
            line.segment.end,
            line.orientation,
            1,
            1,
        );
    }

    let mut crossings = Vec::new();
    for y in 0..dimensions.height {
        for x in 0..dimensions.width {
            let sum = horizontal.get_pixel(x, y).0[0] + vertical.get_pixel(x, y).0[0];
            if sum == 2 {
                crossings.push(Point::new(f64::from(x), f64::from(y)));
            }
        }
    }
    crossings
}
