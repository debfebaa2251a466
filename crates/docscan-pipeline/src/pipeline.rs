//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::scan`] which runs every stage in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time and
//! replace the detected outline before rectification:
//!
//! ```rust
//! # use docscan_pipeline::{Pipeline, ScanConfig, ScanError};
//! # fn run(jpeg: Vec<u8>) -> Result<(), ScanError> {
//! let found = Pipeline::new(jpeg, ScanConfig::default())
//!     .decode()?
//!     .downsample()
//!     .detect_edges()
//!     .find_boundary();
//!
//! println!("found: {}", found.boundary().found);
//!
//! let result = found.rectify()?.enhance().into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates.
//!
//! # Coordinates
//!
//! Edge detection and boundary search run on a copy resized to
//! `working_height`. Boundaries returned by the stages are in those
//! working coordinates; [`ScanResult::boundary_original`] holds the same
//! outline mapped back onto the source image.

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::boundary::{Boundary, BoundaryDetection, BoundarySource, find_boundary};
use crate::contour::{Contour, external_contours};
use crate::corners::ReducedLine;
use crate::segments::SegmentDetector;
use crate::types::{Dimensions, LineSegment, Point, Quadrilateral, RgbaImage, ScanConfig, ScanError};

/// Entry point for the incremental pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over encoded image bytes.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(source: Vec<u8>, config: ScanConfig) -> Pending {
        Pending { config, source }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: ScanConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the configuration and decode the source image.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidConfig`] for an unusable configuration,
    /// [`ScanError::EmptyInput`] if the source bytes are empty and
    /// [`ScanError::ImageDecode`] if the data cannot be decoded.
    #[instrument(skip_all, fields(bytes = self.source.len()))]
    pub fn decode(self) -> Result<Decoded, ScanError> {
        self.config.validate()?;
        let original = crate::grayscale::decode(&self.source)?;
        info!(
            width = original.width(),
            height = original.height(),
            "image decoded"
        );
        Ok(Decoded {
            config: self.config,
            original,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
#[must_use = "pipeline stages are consumed by advancing; call .downsample() to continue"]
pub struct Decoded {
    config: ScanConfig,
    original: DynamicImage,
}

impl Decoded {
    /// The decoded source image.
    #[must_use]
    pub const fn original(&self) -> &DynamicImage {
        &self.original
    }

    /// Resize a grayscale copy to the working height.
    pub fn downsample(self) -> Downsampled {
        let resized = crate::downsample::to_working_height(&self.original, self.config.working_height);
        let working = crate::grayscale::to_grayscale(&resized.image);
        debug!(
            width = working.width(),
            height = working.height(),
            ratio = resized.ratio,
            "working copy"
        );
        Downsampled {
            config: self.config,
            original: self.original,
            working,
            ratio: resized.ratio,
        }
    }
}

// ───────────────────────── Stage 2: Downsampled ──────────────────────

/// Pipeline state after resizing to the working height.
#[must_use = "pipeline stages are consumed by advancing; call .detect_edges() to continue"]
pub struct Downsampled {
    config: ScanConfig,
    original: DynamicImage,
    working: GrayImage,
    ratio: f64,
}

impl Downsampled {
    /// The grayscale working copy.
    #[must_use]
    pub const fn working(&self) -> &GrayImage {
        &self.working
    }

    /// `original height / working height`.
    #[must_use]
    pub const fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Blur, close and run Canny on the working copy.
    pub fn detect_edges(self) -> EdgesDetected {
        let blurred = crate::blur::gaussian_blur(&self.working, self.config.blur_sigma);
        let closed = crate::blur::close(&blurred, self.config.close_radius);
        let edges = crate::edge::canny(&closed, self.config.canny_low, self.config.canny_high);
        debug!(
            edge_pixels = crate::edge::count_edge_pixels(&edges),
            "edges detected"
        );
        EdgesDetected {
            config: self.config,
            original: self.original,
            working: self.working,
            ratio: self.ratio,
            edges,
        }
    }
}

// ───────────────────────── Stage 3: EdgesDetected ────────────────────

/// Pipeline state after edge detection.
#[must_use = "pipeline stages are consumed by advancing; call .find_boundary() to continue"]
pub struct EdgesDetected {
    config: ScanConfig,
    original: DynamicImage,
    working: GrayImage,
    ratio: f64,
    edges: GrayImage,
}

impl EdgesDetected {
    /// The binary edge map.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Detect segments and contours on the edge map and select the
    /// document outline.
    #[instrument(skip_all)]
    pub fn find_boundary(self) -> BoundaryFound {
        let frame = Dimensions::of(&self.edges);
        let segments = self.config.segment_detector.detect(&self.edges);
        let contours = external_contours(&self.edges);
        debug!(
            segments = segments.len(),
            contours = contours.len(),
            "boundary inputs"
        );
        let detection = find_boundary(&segments, &contours, frame, &self.config.boundary);
        BoundaryFound {
            config: self.config,
            original: self.original,
            working: self.working,
            ratio: self.ratio,
            edges: self.edges,
            segments,
            contours,
            detection,
        }
    }
}

// ───────────────────────── Stage 4: BoundaryFound ────────────────────

/// Pipeline state after boundary selection.
///
/// The outline may be replaced with [`with_boundary`](Self::with_boundary)
/// before calling [`rectify`](Self::rectify).
#[must_use = "pipeline stages are consumed by advancing; call .rectify() to continue"]
pub struct BoundaryFound {
    config: ScanConfig,
    original: DynamicImage,
    working: GrayImage,
    ratio: f64,
    edges: GrayImage,
    segments: Vec<LineSegment>,
    contours: Vec<Contour>,
    detection: BoundaryDetection,
}

impl BoundaryFound {
    /// The selected boundary, in working coordinates.
    #[must_use]
    pub const fn boundary(&self) -> &Boundary {
        &self.detection.boundary
    }

    /// Corner candidates, in working coordinates.
    #[must_use]
    pub fn corners(&self) -> &[Point] {
        &self.detection.corners
    }

    /// Segments found on the edge map.
    #[must_use]
    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    /// Outer contours of the edge map, largest first.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// The grayscale working copy.
    #[must_use]
    pub const fn working(&self) -> &GrayImage {
        &self.working
    }

    /// Replace the detected outline with `corners` (working
    /// coordinates, any order).
    pub fn with_boundary(mut self, corners: [Point; 4]) -> Self {
        let boundary = Boundary::manual(corners);
        info!(quad = ?boundary.quad, "boundary overridden");
        self.detection.boundary = boundary;
        self
    }

    /// Warp the boundary region of the full-resolution original into an
    /// upright page.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Rectification`] if the outline, mapped onto
    /// the original, is too small or admits no perspective transform.
    #[instrument(skip_all, fields(ratio = self.ratio))]
    pub fn rectify(self) -> Result<Rectified, ScanError> {
        let boundary_original = self.detection.boundary.scaled(self.ratio);
        let rectified = crate::rectify::four_point_transform(
            &crate::grayscale::to_rgba(&self.original),
            &boundary_original.quad,
        )?;
        info!(
            width = rectified.width(),
            height = rectified.height(),
            "page rectified"
        );
        Ok(Rectified {
            config: self.config,
            original_dimensions: Dimensions::new(self.original.width(), self.original.height()),
            working: self.working,
            ratio: self.ratio,
            edges: self.edges,
            segments: self.segments,
            detection: self.detection,
            boundary_original,
            rectified,
        })
    }
}

// ───────────────────────── Stage 5: Rectified ────────────────────────

/// Pipeline state after perspective correction.
#[must_use = "pipeline stages are consumed by advancing; call .enhance() to continue"]
pub struct Rectified {
    config: ScanConfig,
    original_dimensions: Dimensions,
    working: GrayImage,
    ratio: f64,
    edges: GrayImage,
    segments: Vec<LineSegment>,
    detection: BoundaryDetection,
    boundary_original: Boundary,
    rectified: RgbaImage,
}

impl Rectified {
    /// The upright page, before enhancement.
    #[must_use]
    pub const fn rectified(&self) -> &RgbaImage {
        &self.rectified
    }

    /// Sharpen and binarize the page when `config.enhance` is set;
    /// otherwise keep the color page.
    pub fn enhance(self) -> Enhanced {
        let output = if self.config.enhance {
            let gray = DynamicImage::ImageRgba8(self.rectified.clone()).into_luma8();
            DynamicImage::ImageLuma8(crate::rectify::enhance(
                &gray,
                self.config.sharpen_sigma,
                self.config.threshold_radius,
                self.config.threshold_offset,
            ))
        } else {
            DynamicImage::ImageRgba8(self.rectified.clone())
        };
        Enhanced {
            result: ScanResult {
                original_dimensions: self.original_dimensions,
                working: self.working,
                ratio: self.ratio,
                edges: self.edges,
                segments: self.segments,
                detection: self.detection,
                boundary_original: self.boundary_original,
                rectified: self.rectified,
                output,
            },
        }
    }
}

// ───────────────────────── Stage 6: Enhanced ─────────────────────────

/// Final pipeline state.
#[must_use = "call .into_result() to extract the ScanResult"]
pub struct Enhanced {
    result: ScanResult,
}

impl Enhanced {
    /// The final page image.
    #[must_use]
    pub const fn output(&self) -> &DynamicImage {
        &self.result.output
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> ScanResult {
        self.result
    }
}

/// Everything a completed scan produced.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Size of the decoded source image.
    pub original_dimensions: Dimensions,
    /// Grayscale copy at the working height.
    pub working: GrayImage,
    /// `original height / working height`.
    pub ratio: f64,
    /// Binary edge map of the working copy.
    pub edges: GrayImage,
    /// Segments detected on the edge map.
    pub segments: Vec<LineSegment>,
    /// Boundary stage output, in working coordinates.
    pub detection: BoundaryDetection,
    /// The selected boundary mapped onto the source image.
    pub boundary_original: Boundary,
    /// Upright color page.
    pub rectified: RgbaImage,
    /// Final page: binarized when enhancement is enabled.
    pub output: DynamicImage,
}

impl ScanResult {
    /// Boundary in working coordinates.
    #[must_use]
    pub const fn boundary(&self) -> &Boundary {
        &self.detection.boundary
    }

    /// Corner candidates in working coordinates.
    #[must_use]
    pub fn corners(&self) -> &[Point] {
        &self.detection.corners
    }

    /// Reduced lines in working coordinates.
    #[must_use]
    pub fn lines(&self) -> &[ReducedLine] {
        &self.detection.lines
    }

    /// Serializable digest of this result.
    #[must_use]
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            found: self.boundary_original.found,
            source: self.boundary_original.source,
            quad: self.boundary_original.quad,
            original: self.original_dimensions,
            output: Dimensions::new(self.output.width(), self.output.height()),
            segments: self.segments.len(),
            corner_candidates: self.detection.corners.len(),
        }
    }
}

/// Compact, serializable outcome of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Whether a document outline was detected.
    pub found: bool,
    /// Where the outline came from.
    pub source: BoundarySource,
    /// Outline in source-image coordinates.
    pub quad: Quadrilateral,
    /// Source image size.
    pub original: Dimensions,
    /// Output page size.
    pub output: Dimensions,
    /// Number of detected segments.
    pub segments: usize,
    /// Number of corner candidates after filtering.
    pub corner_candidates: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .ok();
        buf
    }

    /// Light page on a dark desk, 400x1000.
    fn page_on_desk() -> Vec<u8> {
        let img = RgbaImage::from_fn(400, 1000, |x, y| {
            if (60..340).contains(&x) && (100..900).contains(&y) {
                Rgba([235, 235, 230, 255])
            } else {
                Rgba([40, 35, 30, 255])
            }
        });
        encode_png(&img)
    }

    #[test]
    fn invalid_config_is_rejected_before_decoding() {
        let config = ScanConfig {
            working_height: 0,
            ..ScanConfig::default()
        };
        let result = Pipeline::new(page_on_desk(), config).decode();
        assert!(matches!(result, Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn empty_source_is_rejected() {
        let result = Pipeline::new(Vec::new(), ScanConfig::default()).decode();
        assert!(matches!(result, Err(ScanError::EmptyInput)));
    }

    #[test]
    fn downsample_reaches_working_height() {
        let stage = Pipeline::new(page_on_desk(), ScanConfig::default())
            .decode()
            .unwrap()
            .downsample();
        assert_eq!(stage.working().height(), 500);
        assert_eq!(stage.working().width(), 200);
        assert!((stage.ratio() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn page_outline_is_found_and_rectified() {
        let found = Pipeline::new(page_on_desk(), ScanConfig::default())
            .decode()
            .unwrap()
            .downsample()
            .detect_edges()
            .find_boundary();
        assert!(found.boundary().found);

        let result = found.rectify().unwrap().enhance().into_result();
        let quad = result.boundary_original.quad;
        let expected = [(60.0, 100.0), (340.0, 100.0), (340.0, 900.0), (60.0, 900.0)];
        for (got, (x, y)) in quad.corners().iter().zip(expected) {
            assert!(got.distance(Point::new(x, y)) < 20.0, "{got:?} vs ({x}, {y})");
        }
        let summary = result.summary();
        assert!(summary.found);
        assert!(summary.output.width.abs_diff(280) < 30);
        assert!(summary.output.height.abs_diff(800) < 30);
    }

    #[test]
    fn manual_boundary_overrides_detection() {
        let config = ScanConfig {
            enhance: false,
            ..ScanConfig::default()
        };
        let result = Pipeline::new(page_on_desk(), config)
            .decode()
            .unwrap()
            .downsample()
            .detect_edges()
            .find_boundary()
            .with_boundary([
                Point::new(150.0, 150.0),
                Point::new(50.0, 50.0),
                Point::new(150.0, 50.0),
                Point::new(50.0, 150.0),
            ])
            .rectify()
            .unwrap()
            .enhance()
            .into_result();

        assert_eq!(result.boundary().source, BoundarySource::Manual);
        // Working ratio is 2, so the page is 200x200 in the source.
        assert_eq!(result.rectified.dimensions(), (200, 200));
        assert!(matches!(result.output, DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn blank_image_falls_back_to_full_frame() {
        let blank = encode_png(&RgbaImage::from_pixel(300, 500, Rgba([128, 128, 128, 255])));
        let result = Pipeline::new(blank, ScanConfig::default())
            .decode()
            .unwrap()
            .downsample()
            .detect_edges()
            .find_boundary()
            .rectify()
            .unwrap()
            .enhance()
            .into_result();
        assert!(!result.boundary().found);
        assert_eq!(result.boundary().source, BoundarySource::FullFrame);
        assert_eq!(result.rectified.dimensions(), (300, 500));
        let page = result.output.to_luma8();
        assert_eq!(page.get_pixel(150, 250), &Luma([255]));
    }

    #[test]
    fn summary_serializes() {
        let summary = ScanSummary {
            found: false,
            source: BoundarySource::FullFrame,
            quad: Quadrilateral::frame(Dimensions::new(10, 20)),
            original: Dimensions::new(10, 20),
            output: Dimensions::new(10, 20),
            segments: 0,
            corner_candidates: 0,
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: ScanSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
        assert!(json.contains("\"full_frame\""));
    }
}
