//! Candidate quadrilaterals and their scoring.
//!
//! Two independent sources propose a document outline:
//!
//! - **Corners**: every 4-subset of the corner candidates is ordered
//!   into a quadrilateral, the largest few by area are kept, and the one
//!   closest to a rectangle (smallest interior angle spread) is checked
//!   against the [`ValidityCriteria`].
//! - **Contours**: the largest outer contours of the edge map are
//!   approximated by polygons; the first one that is a valid
//!   quadrilateral wins.
//!
//! Area ranking and angle ranking are separate passes so each can be
//! tuned and tested on its own.

use tracing::{debug, warn};

use crate::contour::{Contour, approximate_polygon};
use crate::geometry::angle_range;
use crate::types::{BoundaryConfig, Dimensions, Point, Quadrilateral, ValidityCriteria};

/// Whether `quad` covers more than `min_area_ratio` of the frame and has
/// an interior angle spread below `max_angle_range`.
///
/// Quadrilaterals whose angles cannot be computed are invalid.
#[must_use]
pub fn is_valid_quad(quad: &Quadrilateral, frame: Dimensions, criteria: &ValidityCriteria) -> bool {
    if quad.area() <= frame.area() * criteria.min_area_ratio {
        return false;
    }
    match angle_range(quad) {
        Ok(range) => range < criteria.max_angle_range,
        Err(err) => {
            debug!(%err, "rejecting quadrilateral with degenerate angles");
            false
        }
    }
}

/// Every 4-combination of `corners`, each in canonical order.
///
/// Combinations are produced in lexicographic index order.
#[must_use]
pub fn enumerate_quads(corners: &[Point]) -> Vec<Quadrilateral> {
    let n = corners.len();
    let mut quads = Vec::new();
    for a in 0..n {
        for b in (a + 1)..n {
            for c in (b + 1)..n {
                for d in (c + 1)..n {
                    quads.push(Quadrilateral::from_points([
                        corners[a], corners[b], corners[c], corners[d],
                    ]));
                }
            }
        }
    }
    quads
}

/// The `keep` largest quadrilaterals, largest first.
///
/// Equal areas keep their input order.
#[must_use]
pub fn rank_by_area(quads: Vec<Quadrilateral>, keep: usize) -> Vec<Quadrilateral> {
    let mut scored: Vec<(f64, Quadrilateral)> = quads.into_iter().map(|q| (q.area(), q)).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(keep);
    scored.into_iter().map(|(_, q)| q).collect()
}

/// Quadrilaterals paired with their angle range, most rectangular first.
///
/// Quadrilaterals whose angles cannot be computed are skipped. Equal
/// ranges keep their input order.
#[must_use]
pub fn rank_by_angle_range(quads: &[Quadrilateral]) -> Vec<(Quadrilateral, f64)> {
    let mut scored: Vec<(Quadrilateral, f64)> = quads
        .iter()
        .filter_map(|q| match angle_range(q) {
            Ok(range) => Some((*q, range)),
            Err(err) => {
                debug!(%err, quad = ?q, "skipping candidate");
                None
            }
        })
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored
}

/// Best valid quadrilateral built from corner candidates.
///
/// Returns `None` with fewer than four corners, with more than
/// `config.max_corner_candidates` corners, or when the best-ranked
/// quadrilateral fails validation.
#[must_use]
pub fn quad_from_corners(
    corners: &[Point],
    frame: Dimensions,
    config: &BoundaryConfig,
) -> Option<Quadrilateral> {
    if corners.len() < 4 {
        return None;
    }
    if corners.len() > config.max_corner_candidates {
        warn!(
            corners = corners.len(),
            cap = config.max_corner_candidates,
            "too many corner candidates; skipping corner-based candidates"
        );
        return None;
    }

    let quads = enumerate_quads(corners);
    let total = quads.len();
    let largest = rank_by_area(quads, config.top_area_candidates);
    let (best, range) = rank_by_angle_range(&largest).into_iter().next()?;

    let valid = is_valid_quad(&best, frame, &config.validity);
    debug!(
        combinations = total,
        area = best.area(),
        angle_range = range,
        valid,
        "best corner quadrilateral"
    );
    valid.then_some(best)
}

/// First valid quadrilateral approximated from the largest contours.
///
/// Only the `config.contour_candidates` largest contours are examined,
/// in descending area order.
#[must_use]
pub fn quad_from_contours(
    contours: &[Contour],
    frame: Dimensions,
    config: &BoundaryConfig,
) -> Option<Quadrilateral> {
    let mut ranked: Vec<&Contour> = contours.iter().collect();
    ranked.sort_by(|a, b| b.area().total_cmp(&a.area()));

    ranked
        .into_iter()
        .take(config.contour_candidates)
        .find_map(|contour| {
            let approx =
                approximate_polygon(contour.points(), config.contour_approx_tolerance, true);
            let vertices = <[Point; 4]>::try_from(approx.as_slice()).ok()?;
            let quad = Quadrilateral::from_points(vertices);
            let valid = is_valid_quad(&quad, frame, &config.validity);
            debug!(
                contour_points = contour.len(),
                area = quad.area(),
                valid,
                "contour quadrilateral"
            );
            valid.then_some(quad)
        })
}
