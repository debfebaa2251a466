//! Contour extraction: outer borders of connected regions in a binary map.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! extraction and the [`ContourTracerKind`] enum for selecting which
//! algorithm to use at runtime. The boundary engine only needs the
//! outermost borders, so hole borders and nested regions are dropped.

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::geometry::polygon_area;
use crate::types::Point;

/// A closed polygonal border, as a sequence of vertices without the
/// closing repeat of the first point.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from its vertices.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the contour has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Enclosed area (shoelace).
    #[must_use]
    pub fn area(&self) -> f64 {
        polygon_area(&self.0)
    }

    /// Length of the closed border, including the closing edge.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        let Some((&first, rest)) = self.0.split_first() else {
            return 0.0;
        };
        let mut prev = first;
        let mut total = 0.0;
        for &p in rest {
            total += prev.distance(p);
            prev = p;
        }
        total + prev.distance(first)
    }
}

/// Selects which contour extraction algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`,
    /// keeping only outer borders that have no enclosing border.
    #[default]
    External,
}

/// Trait for contour extraction strategies.
///
/// Input: a binary map (non-zero pixels = foreground).
/// Output: one [`Contour`] per outermost connected region.
pub trait ContourTracer {
    /// Extract contours from the given binary map.
    fn trace(&self, binary: &GrayImage) -> Vec<Contour>;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, binary: &GrayImage) -> Vec<Contour> {
        match *self {
            Self::External => trace_external(binary),
        }
    }
}

fn trace_external(binary: &GrayImage) -> Vec<Contour> {
    imageproc::contours::find_contours::<u32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            Contour::new(
                c.points
                    .into_iter()
                    .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                    .collect(),
            )
        })
        .collect()
}

/// Outer contours of `binary`, largest enclosed area first.
///
/// Equal areas keep their tracing order.
#[must_use = "returns the extracted contours"]
pub fn external_contours(binary: &GrayImage) -> Vec<Contour> {
    let mut contours = ContourTracerKind::External.trace(binary);
    sort_by_area_descending(&mut contours);
    contours
}

/// Stable in-place sort, largest enclosed area first.
pub fn sort_by_area_descending(contours: &mut [Contour]) {
    contours.sort_by(|a, b| b.area().total_cmp(&a.area()));
}

/// Ramer-Douglas-Peucker polygon approximation.
///
/// Vertices within `tolerance` pixels of the chord between their kept
/// neighbors are removed. Open curves keep both endpoints. Closed curves
/// are split at two mutually distant vertices (the vertex farthest from
/// the first point, and the vertex farthest from that one), which are
/// always kept, and each half is simplified independently; on a convex
/// outline both split vertices are true corners.
///
/// Inputs with fewer than 3 points are returned unchanged.
#[must_use = "returns the approximated polygon"]
pub fn approximate_polygon(points: &[Point], tolerance: f64, closed: bool) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    if !closed {
        let mut kept = vec![false; points.len()];
        kept[0] = true;
        kept[points.len() - 1] = true;
        rdp_recurse(points, 0, points.len() - 1, tolerance, &mut kept);
        return collect_kept(points, &kept);
    }

    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if points[a].distance_squared(points[b]) == 0.0 {
        // Every vertex coincides.
        return vec![points[0]];
    }
    let (first, second) = (a.min(b), a.max(b));

    // Rotate so the ring starts at `first`, then repeat it at the end so
    // the second half can run back to the start.
    let n = points.len();
    let mut ring: Vec<Point> = points[first..]
        .iter()
        .chain(&points[..first])
        .copied()
        .collect();
    ring.push(ring[0]);
    let split = second - first;

    let mut kept = vec![false; n + 1];
    kept[0] = true;
    kept[split] = true;
    rdp_recurse(&ring, 0, split, tolerance, &mut kept);
    rdp_recurse(&ring, split, n, tolerance, &mut kept);

    collect_kept(&ring[..n], &kept[..n])
}

fn collect_kept(points: &[Point], kept: &[bool]) -> Vec<Point> {
    points
        .iter()
        .zip(kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Index of the first point farthest from `origin`.
fn farthest_from(points: &[Point], origin: Point) -> usize {
    let mut best = 0;
    let mut best_dist = f64::NEG_INFINITY;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance_squared(origin);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line through `a` and `b`.
///
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
