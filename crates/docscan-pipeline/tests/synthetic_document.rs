//! Integration test: run synthetic photos of a page through the full scan pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use docscan_pipeline::{BoundarySource, Point, ScanConfig, scan};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_polygon_mut;

const DESK: Rgba<u8> = Rgba([45, 40, 38, 255]);
const PAPER: Rgba<u8> = Rgba([238, 236, 228, 255]);

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
    .unwrap();
    buf
}

/// 800x1000 photo of a slightly rotated, slightly keystoned page.
fn tilted_page() -> (Vec<u8>, [Point; 4]) {
    let corners = [(150, 120), (650, 100), (700, 880), (100, 900)];
    let mut img = RgbaImage::from_pixel(800, 1000, DESK);
    let polygon: Vec<imageproc::point::Point<i32>> = corners
        .iter()
        .map(|&(x, y)| imageproc::point::Point::new(x, y))
        .collect();
    draw_polygon_mut(&mut img, &polygon, PAPER);
    // A few dark "text lines" on the page.
    for row in 0..8 {
        let y = 250 + row * 60;
        for x in 220..560 {
            for dy in 0..8 {
                img.put_pixel(x, y + dy, Rgba([30, 30, 30, 255]));
            }
        }
    }
    let expected = corners.map(|(x, y)| Point::new(f64::from(x), f64::from(y)));
    (encode_png(&img), expected)
}

#[test]
fn tilted_page_is_found_and_rectified() {
    let (bytes, expected) = tilted_page();
    let result = scan(&bytes, &ScanConfig::default()).expect("scan should succeed");

    let summary = result.summary();
    eprintln!("summary: {summary:?}");
    assert!(summary.found, "expected the page outline to be detected");
    assert_ne!(summary.source, BoundarySource::FullFrame);

    for (got, want) in result.boundary_original.quad.corners().iter().zip(expected) {
        assert!(
            got.distance(want) < 40.0,
            "corner {got:?} too far from {want:?}"
        );
    }

    // Longest edges: bottom ~600 px, sides ~782 px.
    assert!(summary.output.height > summary.output.width);
    assert!(summary.output.height.abs_diff(782) < 60, "{summary:?}");
    assert!(summary.output.width.abs_diff(600) < 60, "{summary:?}");

    // Enhancement produces a binary page.
    let page = result.output.to_luma8();
    assert!(page.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
}

#[test]
fn blank_photo_falls_back_to_full_frame() {
    let bytes = encode_png(&RgbaImage::from_pixel(640, 480, DESK));
    let result = scan(&bytes, &ScanConfig::default()).unwrap();

    let summary = result.summary();
    assert!(!summary.found);
    assert_eq!(summary.source, BoundarySource::FullFrame);
    let br = result.boundary_original.quad.bottom_right();
    // The working copy is rounded to whole pixels, so allow sub-pixel slack.
    assert!((br.x - 640.0).abs() < 1.0 && (br.y - 480.0).abs() < 1.0, "{br:?}");
    assert_eq!((summary.output.width, summary.output.height), (640, 480));
}

#[test]
fn summary_round_trips_through_json() {
    let (bytes, _) = tilted_page();
    let config = ScanConfig {
        enhance: false,
        ..ScanConfig::default()
    };
    let summary = scan(&bytes, &config).unwrap().summary();
    let json = serde_json::to_string(&summary).unwrap();
    let back: docscan_pipeline::ScanSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back, summary);
}
