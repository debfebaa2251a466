//! docscan: turn photographs of paper documents into flat, scan-like pages.
//!
//! Detects the page outline in each input image, warps the page upright
//! and (by default) binarizes it. Optionally writes diagnostic overlays
//! and splits the page into text blocks.
//!
//! # Usage
//!
//! ```text
//! docscan --image photo.jpg --output out/
//! docscan --images photos/ --output out/ --jobs 4 --verbose
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`). With `--json`, one summary object per image is
//! printed to stdout.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::{ArgGroup, Parser};
use docscan_pipeline::{
    BoundaryConfig, ScanConfig, ScanError, ScanResult, ScanSummary, SegmentationConfig,
    ValidityCriteria, crop_blocks, overlay, segment_blocks,
};
use image::DynamicImage;
use tracing::{debug, error, info, warn};

/// File extensions picked up in directory mode (compared case-insensitively).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "jp2", "png", "bmp", "tiff", "tif"];

/// Extensions the output encoder can write; anything else is saved as PNG.
const WRITABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Scan photographed documents into flat, thresholded images.
#[derive(Parser)]
#[command(
    name = "docscan",
    version,
    group(ArgGroup::new("input").required(true).args(["image", "images"]))
)]
struct Cli {
    /// Path to a single input image.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Directory of input images (jpg, jpeg, jp2, png, bmp, tiff, tif).
    #[arg(long)]
    images: Option<PathBuf>,

    /// Directory that receives the scanned pages.
    #[arg(long, short, default_value = "output")]
    output: PathBuf,

    /// Ask for manual corner correction when no outline is found.
    ///
    /// Manual correction needs a display; this build logs a warning and
    /// keeps the full frame instead.
    #[arg(short, long)]
    interactive: bool,

    /// Split each scanned page into text blocks.
    #[arg(short = 'S', long)]
    segmentation: bool,

    /// Write diagnostic images next to each output.
    #[arg(long)]
    verbose: bool,

    /// Print one JSON summary per image to stdout.
    #[arg(long)]
    json: bool,

    /// Number of images processed in parallel.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    jobs: usize,

    /// Full scan config as a JSON string.
    ///
    /// When provided, all other scan parameter flags are ignored.
    /// The JSON must be a valid `ScanConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Minimum fraction of the frame a page outline must cover.
    #[arg(long, default_value_t = ValidityCriteria::DEFAULT_MIN_AREA_RATIO)]
    min_area_ratio: f64,

    /// Maximum spread between the largest and smallest corner angle, in degrees.
    #[arg(long, default_value_t = ValidityCriteria::DEFAULT_MAX_ANGLE_RANGE)]
    max_angle_range: f64,

    /// Corner candidates closer than this (working pixels) are merged.
    #[arg(long, default_value_t = BoundaryConfig::DEFAULT_MIN_CORNER_DISTANCE)]
    min_corner_distance: f64,

    /// Height of the working copy used for detection.
    #[arg(long, default_value_t = ScanConfig::DEFAULT_WORKING_HEIGHT, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    working_height: u32,

    /// Keep the rectified color page instead of binarizing it.
    #[arg(long)]
    no_enhance: bool,
}

/// Per-image failures.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Build a [`ScanConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<ScanConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        ScanConfig {
            working_height: cli.working_height,
            enhance: !cli.no_enhance,
            boundary: BoundaryConfig {
                validity: ValidityCriteria {
                    min_area_ratio: cli.min_area_ratio,
                    max_angle_range: cli.max_angle_range,
                },
                min_corner_distance: cli.min_corner_distance,
                ..BoundaryConfig::default()
            },
            ..ScanConfig::default()
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| allowed.iter().any(|a| a.eq_ignore_ascii_case(e)))
}

/// Input files, sorted by path.
fn collect_inputs(cli: &Cli) -> Result<Vec<PathBuf>, CliError> {
    if let Some(ref image) = cli.image {
        return Ok(vec![image.clone()]);
    }
    let Some(ref dir) = cli.images else {
        return Ok(Vec::new());
    };

    let read_err = |source| CliError::Read {
        path: dir.clone(),
        source,
    };
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && has_extension(&path, IMAGE_EXTENSIONS) {
            inputs.push(path);
        } else {
            debug!(path = %path.display(), "skipping");
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Where the page scanned from `input` is written.
fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let name = input.file_name().map_or_else(|| PathBuf::from("page.png"), PathBuf::from);
    let path = output_dir.join(name);
    if has_extension(&path, WRITABLE_EXTENSIONS) {
        path
    } else {
        path.with_extension("png")
    }
}

fn create_dir(path: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(path).map_err(|source| CliError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Save `image`, dropping alpha so every format can encode it.
fn save(image: &DynamicImage, path: &Path) -> Result<(), CliError> {
    let written = if image.color().has_alpha() {
        DynamicImage::ImageRgb8(image.to_rgb8()).save(path)
    } else {
        image.save(path)
    };
    written.map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Edge map, segments, corners, boundary and rectified page.
fn write_diagnostics(result: &ScanResult, dir: &Path) -> Result<(), CliError> {
    create_dir(dir)?;
    let working = &result.working;
    let images = [
        ("edges.png", DynamicImage::ImageLuma8(result.edges.clone())),
        (
            "segments.png",
            DynamicImage::ImageRgba8(overlay::draw_segments(working, &result.segments)),
        ),
        (
            "corners.png",
            DynamicImage::ImageRgba8(overlay::draw_corners(
                working,
                result.lines(),
                result.corners(),
            )),
        ),
        (
            "boundary.png",
            DynamicImage::ImageRgba8(overlay::draw_boundary(
                &overlay::gray_to_rgba(working),
                &result.boundary().quad,
            )),
        ),
        ("rectified.png", DynamicImage::ImageRgba8(result.rectified.clone())),
    ];
    for (name, image) in &images {
        save(image, &dir.join(name))?;
    }
    Ok(())
}

/// One crop per text block plus the page with block outlines.
fn write_segmentation(result: &ScanResult, dir: &Path) -> Result<usize, CliError> {
    let page = result.output.to_luma8();
    let blocks = segment_blocks(&page, &SegmentationConfig::default());

    let contours_dir = dir.join("contours");
    create_dir(&contours_dir)?;
    for (i, crop) in crop_blocks(&page, &blocks).into_iter().enumerate() {
        save(
            &DynamicImage::ImageLuma8(crop),
            &contours_dir.join(format!("contour_{i}.png")),
        )?;
    }
    save(
        &DynamicImage::ImageRgba8(overlay::draw_blocks(&page, &blocks)),
        &dir.join("segmented.png"),
    )?;
    Ok(blocks.len())
}

/// Scan one image and write everything requested for it.
fn process_one(input: &Path, cli: &Cli, config: &ScanConfig) -> Result<ScanSummary, CliError> {
    let bytes = std::fs::read(input).map_err(|source| CliError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let result = docscan_pipeline::scan(&bytes, config)?;

    if cli.interactive && !result.boundary().found {
        warn!(
            path = %input.display(),
            "manual corner correction is not available; keeping the full frame"
        );
    }

    create_dir(&cli.output)?;
    let out = output_path(&cli.output, input);
    save(&result.output, &out)?;

    let stem = input
        .file_stem()
        .map_or_else(|| PathBuf::from("page"), PathBuf::from);
    let extras = cli.output.join(stem);
    if cli.verbose {
        write_diagnostics(&result, &extras)?;
    }
    if cli.segmentation {
        let blocks = write_segmentation(&result, &extras)?;
        info!(path = %input.display(), blocks, "page segmented");
    }

    let summary = result.summary();
    info!(
        path = %input.display(),
        output = %out.display(),
        found = summary.found,
        source = ?summary.source,
        "scanned"
    );
    Ok(summary)
}

/// Process `inputs` on `cli.jobs` worker threads; returns the failure count.
fn run_all(inputs: &[PathBuf], cli: &Cli, config: &ScanConfig) -> usize {
    let next = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);
    let workers = cli.jobs.min(inputs.len()).max(1);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                while let Some(input) = inputs.get(next.fetch_add(1, Ordering::Relaxed)) {
                    match process_one(input, cli, config) {
                        Ok(summary) if cli.json => match serde_json::to_string(&summary) {
                            Ok(json) => println!("{json}"),
                            Err(e) => {
                                error!(path = %input.display(), error = %e, "cannot serialize summary");
                                failures.fetch_add(1, Ordering::Relaxed);
                            }
                        },
                        Ok(_) => {}
                        Err(e) => {
                            error!(path = %input.display(), error = %e, "scan failed");
                            failures.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    failures.into_inner()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    debug!(?config, "scan config");

    let inputs = match collect_inputs(&cli) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if inputs.is_empty() {
        warn!("no input images found");
        return ExitCode::SUCCESS;
    }
    info!(images = inputs.len(), jobs = cli.jobs, "starting");

    let failures = run_all(&inputs, &cli, &config);
    if failures > 0 {
        error!(failures, total = inputs.len(), "some images failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("docscan").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn an_input_is_required() {
        assert!(Cli::try_parse_from(["docscan"]).is_err());
        assert!(Cli::try_parse_from(["docscan", "--image", "a.png", "--images", "dir"]).is_err());
    }

    #[test]
    fn flag_defaults_match_config_defaults() {
        let cli = parse(&["--image", "a.png"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, ScanConfig::default());
        assert_eq!(cli.output, PathBuf::from("output"));
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "--image",
            "a.png",
            "--min-area-ratio",
            "0.4",
            "--no-enhance",
            "-S",
            "-i",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert!((config.boundary.validity.min_area_ratio - 0.4).abs() < f64::EPSILON);
        assert!(!config.enhance);
        assert!(cli.segmentation && cli.interactive);
    }

    #[test]
    fn invalid_config_json_is_rejected() {
        let cli = parse(&["--image", "a.png", "--config-json", "{\"working_height\": 0}"]);
        assert!(config_from_cli(&cli).is_err());
        let cli = parse(&["--image", "a.png", "--config-json", "not json"]);
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(has_extension(Path::new("a/B.JPG"), IMAGE_EXTENSIONS));
        assert!(has_extension(Path::new("scan.jp2"), IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("notes.txt"), IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("README"), IMAGE_EXTENSIONS));
    }

    #[test]
    fn unwritable_formats_become_png() {
        let out = Path::new("out");
        assert_eq!(output_path(out, Path::new("in/a.jpg")), PathBuf::from("out/a.jpg"));
        assert_eq!(output_path(out, Path::new("in/b.jp2")), PathBuf::from("out/b.png"));
    }
}
