//! docscan-pipeline: document boundary detection and rectification
//! (sans-IO).
//!
//! Turns a photo of a paper document into an upright, scan-like page:
//! decode -> resize to working height -> blur -> close -> Canny ->
//! segment and contour extraction -> boundary selection -> perspective
//! warp -> sharpen + adaptive threshold.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. All filesystem interaction
//! lives in the `docscan` binary.
//!
//! The boundary engine ([`corners`], [`candidates`], [`boundary`]) only
//! depends on geometric inputs and can be driven without any image at
//! all.

pub mod blur;
pub mod boundary;
pub mod candidates;
pub mod contour;
pub mod corners;
pub mod downsample;
pub mod edge;
pub mod geometry;
pub mod grayscale;
pub mod overlay;
pub mod pipeline;
pub mod rectify;
pub mod segmentation;
pub mod segments;
pub mod types;

pub use boundary::{Boundary, BoundaryDetection, BoundarySource, find_boundary};
pub use contour::{Contour, ContourTracer, ContourTracerKind};
pub use pipeline::{Pipeline, ScanResult, ScanSummary};
pub use segmentation::{BlockRect, SegmentationConfig, crop_blocks, segment_blocks};
pub use segments::{HoughSegmentDetector, SegmentDetector};
pub use types::{
    BoundaryConfig, Dimensions, GeometryError, LineReduction, LineSegment, Orientation, Point,
    Quadrilateral, ScanConfig, ScanError, ValidityCriteria,
};

/// Run the full scan pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP, TIFF) and a
/// configuration, then produces a [`ScanResult`] holding the rectified
/// page together with every intermediate.
///
/// When no document outline is detected the whole frame is rectified and
/// [`Boundary::found`] is `false`; this is not an error.
///
/// # Errors
///
/// Returns [`ScanError::InvalidConfig`] if `config` fails validation.
/// Returns [`ScanError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`ScanError::ImageDecode`] if the image format is unrecognized.
/// Returns [`ScanError::Rectification`] if the selected outline cannot be
/// warped.
pub fn scan(image_bytes: &[u8], config: &ScanConfig) -> Result<ScanResult, ScanError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .downsample()
        .detect_edges()
        .find_boundary()
        .rectify()?
        .enhance()
        .into_result())
}
