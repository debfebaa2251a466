//! Geometry utilities for candidate quadrilaterals.
//!
//! Point ordering, interior angles, angle spread, polygon area, and
//! greedy de-duplication of nearby points. Everything here is pure and
//! allocation-light; candidate counts are small (tens of points).

use geo::{Area, Coord, LineString, Polygon};

use crate::types::{GeometryError, Point, Quadrilateral};

/// Sort four arbitrary points into canonical `(TL, TR, BR, BL)` order.
///
/// Points are first sorted lexicographically so the result does not
/// depend on input order, then ordered clockwise (in image coordinates,
/// y pointing down) by their angle around the centroid. Ties in angle
/// are broken by distance to the centroid and then by coordinates, so
/// collinear and duplicated inputs still produce a deterministic order.
/// The sequence is finally rotated to start at the point with the
/// smallest `x + y` (then smallest `y`, then smallest `x`).
#[must_use]
pub fn order_clockwise_from_top_left(points: [Point; 4]) -> Quadrilateral {
    let mut ordered = points;
    ordered.sort_by(lexicographic);

    let center = Point::new(
        ordered.iter().map(|p| p.x).sum::<f64>() / 4.0,
        ordered.iter().map(|p| p.y).sum::<f64>() / 4.0,
    );

    ordered.sort_by(|a, b| {
        let angle_a = (a.y - center.y).atan2(a.x - center.x);
        let angle_b = (b.y - center.y).atan2(b.x - center.x);
        angle_a
            .total_cmp(&angle_b)
            .then_with(|| {
                center
                    .distance_squared(*a)
                    .total_cmp(&center.distance_squared(*b))
            })
            .then_with(|| lexicographic(a, b))
    });

    let start = (0..ordered.len())
        .min_by(|&i, &j| {
            let (a, b) = (ordered[i], ordered[j]);
            (a.x + a.y)
                .total_cmp(&(b.x + b.y))
                .then_with(|| a.y.total_cmp(&b.y))
                .then_with(|| a.x.total_cmp(&b.x))
        })
        .unwrap_or(0);
    ordered.rotate_left(start);

    Quadrilateral::from_ordered(ordered)
}

fn lexicographic(a: &Point, b: &Point) -> std::cmp::Ordering {
    a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y))
}

/// Angle between two vectors in degrees, in `[0, 180]`.
///
/// Cosines pushed marginally outside `[-1, 1]` by rounding are clamped.
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateGeometry`] if either vector has
/// zero length, and [`GeometryError::NumericDomain`] if the cosine is
/// not finite (non-finite input coordinates).
pub fn angle_between_vectors_degrees(u: Point, v: Point) -> Result<f64, GeometryError> {
    let norm_u = u.x.hypot(u.y);
    let norm_v = v.x.hypot(v.y);
    if norm_u == 0.0 || norm_v == 0.0 {
        return Err(GeometryError::DegenerateGeometry);
    }

    let cosine = u.x.mul_add(v.x, u.y * v.y) / (norm_u * norm_v);
    if !cosine.is_finite() {
        return Err(GeometryError::NumericDomain(cosine));
    }

    Ok(cosine.clamp(-1.0, 1.0).acos().to_degrees())
}

/// Angle at vertex `p2` between the rays `p2 -> p1` and `p2 -> p3`.
///
/// # Errors
///
/// Propagates [`angle_between_vectors_degrees`] errors, e.g. when `p1`
/// or `p3` coincides with `p2`.
pub fn interior_angle_at(p1: Point, p2: Point, p3: Point) -> Result<f64, GeometryError> {
    angle_between_vectors_degrees(p1.sub(p2), p3.sub(p2))
}

/// Spread between the largest and smallest interior angle, in degrees.
///
/// Each angle is measured at one vertex against its two neighbors in
/// canonical order, so a rectangle scores 0 and skewed shapes score
/// higher.
///
/// # Errors
///
/// Returns the first [`GeometryError`] hit by any of the four angles.
pub fn angle_range(quad: &Quadrilateral) -> Result<f64, GeometryError> {
    let [tl, tr, br, bl] = *quad.corners();
    let angles = [
        interior_angle_at(tl, tr, br)?,
        interior_angle_at(bl, tl, tr)?,
        interior_angle_at(tr, br, bl)?,
        interior_angle_at(br, bl, tl)?,
    ];

    let max = angles.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = angles.iter().copied().fold(f64::INFINITY, f64::min);
    Ok(max - min)
}

/// Greedy proximity filter.
///
/// Walks `points` in order and keeps a point only if it is at least
/// `min_dist` away from every point kept so far. Earlier points win.
/// Quadratic in the number of points.
#[must_use = "returns the filtered points"]
pub fn filter_close_points(points: &[Point], min_dist: f64) -> Vec<Point> {
    let min_dist_sq = min_dist * min_dist;
    let mut kept: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if kept.iter().all(|k| k.distance_squared(p) >= min_dist_sq) {
            kept.push(p);
        }
    }
    kept
}

/// Unsigned shoelace area of a closed polygon.
///
/// Fewer than three points enclose nothing and return 0.
#[must_use]
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let ring: LineString<f64> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    Polygon::new(ring, vec![]).unsigned_area()
}
