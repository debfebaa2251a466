//! Final boundary selection.
//!
//! Combines the corner-based and contour-based candidates into exactly
//! one quadrilateral per image. When neither source produced a valid
//! candidate the whole frame is returned and flagged as not found, so
//! downstream stages always have something to rectify.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::candidates::{quad_from_contours, quad_from_corners};
use crate::contour::Contour;
use crate::corners::{ReducedLine, extract_corners};
use crate::types::{BoundaryConfig, Dimensions, LineSegment, Point, Quadrilateral};

/// Which candidate source produced the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySource {
    /// Four of the corner candidates.
    Corners,
    /// A polygon approximated from an outer contour.
    Contour,
    /// Nothing valid was found; the image frame is used.
    FullFrame,
    /// Supplied by the caller, e.g. after manual correction.
    Manual,
}

/// The selected document outline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Canonically ordered corners in working-image coordinates.
    pub quad: Quadrilateral,
    /// `false` when `quad` is the full-frame fallback.
    pub found: bool,
    /// Origin of `quad`.
    pub source: BoundarySource,
}

impl Boundary {
    /// Fallback covering the whole image.
    #[must_use]
    pub fn full_frame(frame: Dimensions) -> Self {
        Self {
            quad: Quadrilateral::frame(frame),
            found: false,
            source: BoundarySource::FullFrame,
        }
    }

    /// A caller-supplied outline. The corners are re-ordered canonically.
    #[must_use]
    pub fn manual(corners: [Point; 4]) -> Self {
        Self {
            quad: Quadrilateral::from_points(corners),
            found: true,
            source: BoundarySource::Manual,
        }
    }

    /// The same boundary in a coordinate system scaled by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            quad: self.quad.scaled(factor),
            ..*self
        }
    }
}

/// Everything the boundary stage computed, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryDetection {
    /// The selected boundary.
    pub boundary: Boundary,
    /// Corner candidates after proximity filtering.
    pub corners: Vec<Point>,
    /// Lines the corners were derived from.
    pub lines: Vec<ReducedLine>,
}

/// Choose between the corner-based and the contour-based candidate.
///
/// The larger candidate wins; on equal area the corner-based one is
/// kept. Without any candidate the full frame is returned.
#[must_use]
pub fn select_boundary(
    from_corners: Option<Quadrilateral>,
    from_contours: Option<Quadrilateral>,
    frame: Dimensions,
) -> Boundary {
    let chosen = match (from_corners, from_contours) {
        (Some(a), Some(b)) if b.area() > a.area() => Some((b, BoundarySource::Contour)),
        (Some(a), _) => Some((a, BoundarySource::Corners)),
        (None, Some(b)) => Some((b, BoundarySource::Contour)),
        (None, None) => None,
    };

    chosen.map_or_else(
        || Boundary::full_frame(frame),
        |(quad, source)| Boundary {
            quad,
            found: true,
            source,
        },
    )
}

/// Run both candidate paths from precomputed corners and contours.
#[must_use]
pub fn find_boundary_from_corners(
    corners: &[Point],
    contours: &[Contour],
    frame: Dimensions,
    config: &BoundaryConfig,
) -> Boundary {
    let from_corners = quad_from_corners(corners, frame, config);
    let from_contours = quad_from_contours(contours, frame, config);
    debug!(
        corner_candidate = from_corners.is_some(),
        contour_candidate = from_contours.is_some(),
        "boundary candidates"
    );
    let boundary = select_boundary(from_corners, from_contours, frame);
    if boundary.found {
        info!(
            source = ?boundary.source,
            area = boundary.quad.area(),
            "boundary selected"
        );
    } else {
        warn!(
            width = frame.width,
            height = frame.height,
            "no valid boundary; falling back to the full frame"
        );
    }
    boundary
}

/// Full boundary stage: corners from `segments`, then candidate
/// selection against `contours`.
#[must_use]
pub fn find_boundary(
    segments: &[LineSegment],
    contours: &[Contour],
    frame: Dimensions,
    config: &BoundaryConfig,
) -> BoundaryDetection {
    let extraction = extract_corners(segments, frame, config);
    debug!(
        segments = segments.len(),
        corners = extraction.corners.len(),
        lines = extraction.lines.len(),
        "corner extraction"
    );
    let boundary = find_boundary_from_corners(&extraction.corners, contours, frame, config);
    BoundaryDetection {
        boundary,
        corners: extraction.corners,
        lines: extraction.lines,
    }
}
