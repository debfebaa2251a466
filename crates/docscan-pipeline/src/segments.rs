//! Line segment detection on a binary edge map.
//!
//! `imageproc` only offers a Hough transform, which reports infinite
//! lines. [`HoughSegmentDetector`] turns each detected line back into
//! finite segments by walking it across the image and keeping the runs
//! of edge pixels it actually passes through.
//!
//! The output is intentionally noisy (several fragmented segments per
//! physical edge); [`corners`](crate::corners) merges them.

use image::GrayImage;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use serde::{Deserialize, Serialize};

use crate::types::{LineSegment, Point};

/// Trait for line segment detection strategies.
///
/// Input: a binary edge map (non-zero pixels = edges).
/// Output: possibly fragmented straight segments in pixel coordinates.
pub trait SegmentDetector {
    /// Detect segments in the given edge map.
    fn detect(&self, edges: &GrayImage) -> Vec<LineSegment>;
}

/// Hough transform followed by a run scan along every detected line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughSegmentDetector {
    /// Minimum accumulator votes for a line to be reported.
    pub vote_threshold: u32,
    /// Non-maximum suppression radius in the accumulator.
    pub suppression_radius: u32,
    /// Runs shorter than this (pixels) are discarded.
    pub min_length: f64,
    /// Longest stretch of missing edge pixels bridged inside one run.
    pub max_gap: u32,
}

impl Default for HoughSegmentDetector {
    fn default() -> Self {
        Self {
            vote_threshold: 40,
            suppression_radius: 8,
            min_length: 20.0,
            max_gap: 4,
        }
    }
}

impl SegmentDetector for HoughSegmentDetector {
    fn detect(&self, edges: &GrayImage) -> Vec<LineSegment> {
        let options = LineDetectionOptions {
            vote_threshold: self.vote_threshold,
            suppression_radius: self.suppression_radius,
        };
        let lines = detect_lines(edges, options);
        lines
            .iter()
            .flat_map(|line| self.runs_along(edges, line))
            .collect()
    }
}

impl HoughSegmentDetector {
    /// Walk `line` one pixel at a time across the whole image and cut it
    /// into runs of edge pixels.
    ///
    /// The line satisfies `x cos(theta) + y sin(theta) = r`.
    #[allow(clippy::cast_possible_truncation)]
    fn runs_along(&self, edges: &GrayImage, line: &PolarLine) -> Vec<LineSegment> {
        let theta = f64::from(line.angle_in_degrees).to_radians();
        let (sin, cos) = theta.sin_cos();
        let r = f64::from(line.r);
        let normal = Point::new(cos, sin);
        let direction = Point::new(-sin, cos);
        let foot = Point::new(r * cos, r * sin);

        let reach = f64::from(edges.width()).hypot(f64::from(edges.height()));
        let steps = reach.ceil() as i64;

        let mut segments = Vec::new();
        let mut run: Option<(Point, Point)> = None;
        let mut gap = 0;

        for i in -steps..=steps {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64;
            let p = Point::new(
                t.mul_add(direction.x, foot.x),
                t.mul_add(direction.y, foot.y),
            );

            if is_edge_near(edges, p, normal) {
                run = Some(run.map_or((p, p), |(first, _)| (first, p)));
                gap = 0;
            } else if let Some((first, last)) = run {
                gap += 1;
                if gap > self.max_gap {
                    self.push_run(&mut segments, first, last);
                    run = None;
                    gap = 0;
                }
            }
        }
        if let Some((first, last)) = run {
            self.push_run(&mut segments, first, last);
        }

        segments
    }

    fn push_run(&self, segments: &mut Vec<LineSegment>, first: Point, last: Point) {
        if first.distance(last) >= self.min_length {
            segments.push(LineSegment::new(first, last, 1.0));
        }
    }
}

/// Whether an edge pixel lies at `p` or one pixel to either side of it
/// along `normal`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn is_edge_near(edges: &GrayImage, p: Point, normal: Point) -> bool {
    let (w, h) = (f64::from(edges.width()), f64::from(edges.height()));
    [-1.0, 0.0, 1.0].iter().any(|&offset: &f64| {
        let x = offset.mul_add(normal.x, p.x).round();
        let y = offset.mul_add(normal.y, p.y).round();
        x >= 0.0 && y >= 0.0 && x < w && y < h && edges.get_pixel(x as u32, y as u32).0[0] > 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Orientation;

    fn horizontal_edges(spans: &[(u32, u32)], y: u32) -> GrayImage {
        let mut img = GrayImage::new(100, 50);
        for &(from, to) in spans {
            for x in from..=to {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        img
    }

    #[test]
    fn blank_image_has_no_segments() {
        let img = GrayImage::new(60, 60);
        assert!(HoughSegmentDetector::default().detect(&img).is_empty());
    }

    #[test]
    fn single_run_along_line() {
        let img = horizontal_edges(&[(10, 89)], 20);
        let line = PolarLine {
            r: 20.0,
            angle_in_degrees: 90,
        };
        let segments = HoughSegmentDetector::default().runs_along(&img, &line);
        assert_eq!(segments.len(), 1);
        let s = segments[0].canonicalized();
        assert!((s.start.x - 10.0).abs() < 1.0, "start {:?}", s.start);
        assert!((s.end.x - 89.0).abs() < 1.0, "end {:?}", s.end);
        assert!((s.start.y - 20.0).abs() < 1e-6);
    }

    #[test]
    fn large_gap_splits_run() {
        let img = horizontal_edges(&[(10, 39), (60, 89)], 20);
        let line = PolarLine {
            r: 20.0,
            angle_in_degrees: 90,
        };
        let segments = HoughSegmentDetector::default().runs_along(&img, &line);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn small_gap_is_bridged() {
        let img = horizontal_edges(&[(10, 48), (51, 89)], 20);
        let line = PolarLine {
            r: 20.0,
            angle_in_degrees: 90,
        };
        let segments = HoughSegmentDetector::default().runs_along(&img, &line);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn short_runs_are_dropped() {
        let img = horizontal_edges(&[(10, 20)], 20);
        let line = PolarLine {
            r: 20.0,
            angle_in_degrees: 90,
        };
        assert!(
            HoughSegmentDetector::default()
                .runs_along(&img, &line)
                .is_empty()
        );
    }

    #[test]
    fn detects_long_horizontal_edge() {
        let img = horizontal_edges(&[(10, 89)], 25);
        let segments = HoughSegmentDetector::default().detect(&img);
        assert!(
            segments
                .iter()
                .any(|s| s.orientation() == Orientation::Horizontal && s.length() > 60.0),
            "got {segments:?}"
        );
    }
}
