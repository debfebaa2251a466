//! Shared types for the docscan boundary engine and pipeline.

use serde::{Deserialize, Serialize};

use crate::segments::HoughSegmentDetector;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// original decoded image without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Both coordinates multiplied by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// The vector from `origin` to `self`.
    #[must_use]
    pub fn sub(self, origin: Self) -> Self {
        Self::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Dominant axis of a [`LineSegment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// `|dx| > |dy|`.
    Horizontal,
    /// `|dx| <= |dy|`.
    Vertical,
}

/// A detected straight segment with the width reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    /// First endpoint.
    pub start: Point,
    /// Second endpoint.
    pub end: Point,
    /// Stroke width reported by the detector, in pixels.
    pub width: f64,
}

impl LineSegment {
    /// Create a new segment.
    #[must_use]
    pub const fn new(start: Point, end: Point, width: f64) -> Self {
        Self { start, end, width }
    }

    /// Classify by comparing the horizontal and vertical extents.
    ///
    /// Ties (including zero-length segments) count as vertical.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        let dx = (self.end.x - self.start.x).abs();
        let dy = (self.end.y - self.start.y).abs();
        if dx > dy {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    /// Endpoints sorted along the dominant axis: left to right for
    /// horizontal segments, top to bottom for vertical ones.
    #[must_use]
    pub fn canonicalized(self) -> Self {
        let swap = match self.orientation() {
            Orientation::Horizontal => self.start.x > self.end.x,
            Orientation::Vertical => self.start.y > self.end.y,
        };
        if swap {
            Self::new(self.end, self.start, self.width)
        } else {
            self
        }
    }

    /// Euclidean length of the segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// Four points ordered clockwise from the top-left corner:
/// top-left, top-right, bottom-right, bottom-left.
///
/// The only ways to build one are [`Quadrilateral::from_points`], which
/// canonicalizes arbitrary input, and [`Quadrilateral::frame`]. Area and
/// angle validity are *not* guaranteed; see
/// [`candidates::is_valid_quad`](crate::candidates::is_valid_quad).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Point; 4]", into = "[Point; 4]")]
pub struct Quadrilateral([Point; 4]);

impl Quadrilateral {
    /// Order four arbitrary points into canonical form.
    #[must_use]
    pub fn from_points(points: [Point; 4]) -> Self {
        crate::geometry::order_clockwise_from_top_left(points)
    }

    /// Wrap points that are already in canonical order.
    pub(crate) const fn from_ordered(points: [Point; 4]) -> Self {
        Self(points)
    }

    /// The full image frame `(0,0) (W,0) (W,H) (0,H)`.
    #[must_use]
    pub fn frame(dimensions: Dimensions) -> Self {
        let w = f64::from(dimensions.width);
        let h = f64::from(dimensions.height);
        Self([
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ])
    }

    /// All four corners in canonical order.
    #[must_use]
    pub const fn corners(&self) -> &[Point; 4] {
        &self.0
    }

    #[must_use]
    pub const fn top_left(&self) -> Point {
        self.0[0]
    }

    #[must_use]
    pub const fn top_right(&self) -> Point {
        self.0[1]
    }

    #[must_use]
    pub const fn bottom_right(&self) -> Point {
        self.0[2]
    }

    #[must_use]
    pub const fn bottom_left(&self) -> Point {
        self.0[3]
    }

    /// Enclosed area in square pixels.
    #[must_use]
    pub fn area(&self) -> f64 {
        crate::geometry::polygon_area(&self.0)
    }

    /// Every corner multiplied by `factor`. Uniform scaling preserves
    /// the canonical order.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.map(|p| p.scaled(factor)))
    }
}

impl From<[Point; 4]> for Quadrilateral {
    fn from(points: [Point; 4]) -> Self {
        Self::from_points(points)
    }
}

impl From<Quadrilateral> for [Point; 4] {
    fn from(quad: Quadrilateral) -> Self {
        quad.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an image buffer.
    #[must_use]
    pub fn of<P: image::Pixel>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Frame area in square pixels.
    #[must_use]
    pub fn area(self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }
}

/// Thresholds a candidate quadrilateral must pass to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityCriteria {
    /// Minimum quad area as a fraction of the frame area (exclusive).
    pub min_area_ratio: f64,
    /// Maximum spread between the largest and smallest interior angle,
    /// in degrees (exclusive).
    pub max_angle_range: f64,
}

impl ValidityCriteria {
    pub const DEFAULT_MIN_AREA_RATIO: f64 = 0.25;
    pub const DEFAULT_MAX_ANGLE_RANGE: f64 = 40.0;
}

impl Default for ValidityCriteria {
    fn default() -> Self {
        Self {
            min_area_ratio: Self::DEFAULT_MIN_AREA_RATIO,
            max_angle_range: Self::DEFAULT_MAX_ANGLE_RANGE,
        }
    }
}

/// How raw segments are merged into at most a few lines per orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineReduction {
    /// Pixels added to both ends of each segment before merging.
    pub extension: u32,
    /// Stroke thickness used when rendering segments for merging.
    pub thickness: u32,
    /// Pixels trimmed from both extremes of a merged component.
    pub trim: u32,
    /// Merged components kept per orientation (largest perimeter first).
    pub per_orientation: usize,
}

impl Default for LineReduction {
    fn default() -> Self {
        Self {
            extension: 5,
            thickness: 2,
            trim: 2,
            per_orientation: 2,
        }
    }
}

/// Configuration of the boundary inference engine.
///
/// Passed by reference into every entry point; nothing here is global,
/// so concurrent scans with different settings cannot interfere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Area and angle thresholds for accepting a quadrilateral.
    pub validity: ValidityCriteria,

    /// Corner candidates closer than this to an earlier one are dropped.
    pub min_corner_distance: f64,

    /// Upper bound on corner candidates before combination enumeration.
    /// Above it the corner path is skipped and only contours are used.
    pub max_corner_candidates: usize,

    /// Quadrilaterals kept after ranking by area.
    pub top_area_candidates: usize,

    /// Largest contours examined by the contour path.
    pub contour_candidates: usize,

    /// Douglas-Peucker tolerance for contour approximation, in pixels.
    pub contour_approx_tolerance: f64,

    /// Segment merging parameters.
    pub lines: LineReduction,
}

impl BoundaryConfig {
    pub const DEFAULT_MIN_CORNER_DISTANCE: f64 = 20.0;
    pub const DEFAULT_MAX_CORNER_CANDIDATES: usize = 40;
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            validity: ValidityCriteria::default(),
            min_corner_distance: Self::DEFAULT_MIN_CORNER_DISTANCE,
            max_corner_candidates: Self::DEFAULT_MAX_CORNER_CANDIDATES,
            top_area_candidates: 5,
            contour_candidates: 5,
            contour_approx_tolerance: 80.0,
            lines: LineReduction::default(),
        }
    }
}

/// Configuration for the full scan pipeline.
///
/// All parameters have defaults tuned for phone photographs of paper
/// documents. Use [`ScanConfig::validate`] before running a pipeline
/// built from untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Height of the working image used for boundary detection.
    pub working_height: u32,

    /// Gaussian blur sigma applied before the morphological close.
    pub blur_sigma: f32,

    /// Radius of the square structuring element of the close
    /// (radius 4 gives a 9x9 square).
    pub close_radius: u8,

    /// Canny low threshold. Clamped to [`edge::MIN_THRESHOLD`](crate::edge::MIN_THRESHOLD).
    pub canny_low: f32,

    /// Canny high threshold.
    pub canny_high: f32,

    /// Line segment detection parameters.
    pub segment_detector: HoughSegmentDetector,

    /// Boundary inference parameters.
    pub boundary: BoundaryConfig,

    /// Whether to sharpen and threshold the rectified image.
    pub enhance: bool,

    /// Sigma of the blur subtracted by the unsharp mask.
    pub sharpen_sigma: f32,

    /// Radius of the local-mean window of the adaptive threshold.
    pub threshold_radius: u32,

    /// Offset subtracted from the local mean of the adaptive threshold.
    pub threshold_offset: i32,
}

impl ScanConfig {
    pub const DEFAULT_WORKING_HEIGHT: u32 = 500;
    pub const DEFAULT_BLUR_SIGMA: f32 = 1.4;
    pub const DEFAULT_CLOSE_RADIUS: u8 = 4;
    pub const DEFAULT_CANNY_LOW: f32 = 0.0;
    pub const DEFAULT_CANNY_HIGH: f32 = 84.0;

    /// Check that every parameter is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ScanError> {
        let invalid = |msg: &str| Err(ScanError::InvalidConfig(msg.to_string()));
        let validity = &self.boundary.validity;

        if self.working_height == 0 {
            return invalid("working_height must be positive");
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return invalid("blur_sigma must be finite and non-negative");
        }
        if !self.canny_low.is_finite() || !self.canny_high.is_finite() {
            return invalid("canny thresholds must be finite");
        }
        if !(0.0..=1.0).contains(&validity.min_area_ratio) {
            return invalid("min_area_ratio must be within 0.0..=1.0");
        }
        if !validity.max_angle_range.is_finite() || validity.max_angle_range <= 0.0 {
            return invalid("max_angle_range must be finite and positive");
        }
        if !self.boundary.min_corner_distance.is_finite() || self.boundary.min_corner_distance < 0.0
        {
            return invalid("min_corner_distance must be finite and non-negative");
        }
        if self.boundary.max_corner_candidates < 4 {
            return invalid("max_corner_candidates must be at least 4");
        }
        if self.boundary.top_area_candidates == 0 {
            return invalid("top_area_candidates must be positive");
        }
        if !self.boundary.contour_approx_tolerance.is_finite()
            || self.boundary.contour_approx_tolerance < 0.0
        {
            return invalid("contour_approx_tolerance must be finite and non-negative");
        }
        if !self.sharpen_sigma.is_finite() || self.sharpen_sigma < 0.0 {
            return invalid("sharpen_sigma must be finite and non-negative");
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            working_height: Self::DEFAULT_WORKING_HEIGHT,
            blur_sigma: Self::DEFAULT_BLUR_SIGMA,
            close_radius: Self::DEFAULT_CLOSE_RADIUS,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            segment_detector: HoughSegmentDetector::default(),
            boundary: BoundaryConfig::default(),
            enhance: true,
            sharpen_sigma: 3.0,
            threshold_radius: 10,
            threshold_offset: 15,
        }
    }
}

/// Failures of the geometric primitives.
///
/// Callers inside the engine treat these as "this candidate is invalid"
/// and move on.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// A vector involved in an angle computation has zero length.
    #[error("degenerate geometry: zero-length vector")]
    DegenerateGeometry,

    /// The cosine of an angle was not a finite number.
    #[error("numeric domain error: cosine {0} is not finite")]
    NumericDomain(f64),
}

/// Errors that can occur while scanning an image.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Scan configuration is invalid.
    #[error("invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// The perspective transform could not be built or applied.
    #[error("rectification failed: {0}")]
    Rectification(String),
}
