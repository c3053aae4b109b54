//! darkroom: apply tone, sharpen, and vignette adjustments to an image
//! file.
//!
//! Decodes the input, scales it to the working width, runs the
//! adjustment pipeline, and writes the result. With `--diagnostics`,
//! `--json`, or `--runs` it also reports per-stage timing and pixel
//! statistics, which is useful for:
//!
//! - Tuning adjustment values against a reference photo
//! - Measuring per-stage durations at different working widths
//! - Seeing where tone adjustments clip to black or white
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin darkroom -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use darkroom_pipeline::diagnostics::{PipelineDiagnostics, SystemClock};
use darkroom_pipeline::scale::{DEFAULT_RESIZE_FILTER, DEFAULT_WORKING_WIDTH};
use darkroom_pipeline::{Adjustments, ResizeFilter, RgbaImage};

/// Apply photo adjustments to an image file.
///
/// Every adjustment defaults to 0, which leaves the image unchanged.
/// Values are not range-limited; roughly -100..100 is the useful span.
#[derive(Parser)]
#[command(name = "darkroom", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Output image path; the format follows the extension.
    #[arg(short, long, default_value = output::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Working width in pixels; the height keeps the aspect ratio.
    ///
    /// Images are scaled up or down to this width. 0 keeps the native
    /// size.
    #[arg(long, default_value_t = DEFAULT_WORKING_WIDTH)]
    width: u32,

    /// Resampling filter used for scaling (nearest, triangle,
    /// catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Exposure, in percent of the current brightness.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    exposure: f64,

    /// Black level, subtracted from every channel.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    black: f64,

    /// Shadow lift, added to every channel.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    shadows: f64,

    /// Contrast around mid-gray, in percent.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    contrast: f64,

    /// Color temperature: positive warms (red up, blue down).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    color_temperature: f64,

    /// Saturation, in percent.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    saturation: f64,

    /// Sharpening strength; 0 or below skips the convolution.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    sharpness: f64,

    /// Vignette strength; 100 darkens the corners to black.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    vignette: f64,

    /// Full adjustment set as a JSON string.
    ///
    /// When provided, all individual adjustment flags are ignored.
    /// Missing fields default to 0.
    #[arg(long)]
    params_json: Option<String>,

    /// Print a per-stage diagnostics report.
    #[arg(long)]
    diagnostics: bool,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,
}

impl Cli {
    /// Whether any diagnostics output was requested.
    const fn wants_diagnostics(&self) -> bool {
        self.diagnostics || self.json || self.runs > 1
    }
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation (fast, decent quality).
    Triangle,
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl Filter {
    const fn to_pipeline(self) -> ResizeFilter {
        match self {
            Self::Nearest => ResizeFilter::Nearest,
            Self::Triangle => ResizeFilter::Triangle,
            Self::CatmullRom => ResizeFilter::CatmullRom,
            Self::Gaussian => ResizeFilter::Gaussian,
            Self::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

/// Maps a [`ResizeFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: ResizeFilter) -> Filter {
    match f {
        ResizeFilter::Nearest => Filter::Nearest,
        ResizeFilter::Triangle => Filter::Triangle,
        ResizeFilter::CatmullRom => Filter::CatmullRom,
        ResizeFilter::Gaussian => Filter::Gaussian,
        ResizeFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from [`DEFAULT_RESIZE_FILTER`] so
/// the two cannot silently diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(DEFAULT_RESIZE_FILTER);

/// Build [`Adjustments`] from CLI arguments.
///
/// If `--params-json` is provided, the JSON is parsed directly and all
/// individual adjustment flags are ignored.
fn params_from_cli(cli: &Cli) -> Result<Adjustments, String> {
    let params = if let Some(ref json) = cli.params_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --params-json: {e}"))?
    } else {
        Adjustments {
            exposure: cli.exposure,
            black: cli.black,
            shadows: cli.shadows,
            contrast: cli.contrast,
            color_temperature: cli.color_temperature,
            saturation: cli.saturation,
            sharpness: cli.sharpness,
            vignette: cli.vignette,
        }
    };
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

/// Read, decode, and scale the input image.
fn load(cli: &Cli) -> Result<RgbaImage, String> {
    let bytes = std::fs::read(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?;

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        bytes.len(),
    );

    let decoded = darkroom_pipeline::decode_rgba(&bytes)
        .map_err(|e| format!("Error decoding {}: {e}", cli.image_path.display()))?;
    let (native_w, native_h) = decoded.dimensions();
    let (scaled, resized) =
        darkroom_pipeline::fit_width(decoded, cli.width, cli.filter.to_pipeline());

    if resized {
        eprintln!(
            "Scaled {native_w}x{native_h} -> {}x{}",
            scaled.width(),
            scaled.height(),
        );
    } else {
        eprintln!("Size: {native_w}x{native_h}");
    }
    Ok(scaled)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let params = match params_from_cli(&cli) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let source = match load(&cli) {
        Ok(img) => img,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Adjustments: {params:#?}");

    let output = if cli.wants_diagnostics() {
        match run_with_diagnostics(&cli, &source, &params) {
            Ok(img) => img,
            Err(code) => return code,
        }
    } else {
        match darkroom_pipeline::process(&source, &params) {
            Ok(img) => img,
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    match output::save(&output, &cli.output) {
        Ok(()) => {
            eprintln!(
                "Written to {} ({}x{})",
                cli.output.display(),
                output.width(),
                output.height(),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error writing {}: {e}", cli.output.display());
            ExitCode::FAILURE
        }
    }
}

/// Run the pipeline `--runs` times, printing diagnostics for each run.
///
/// Returns the output of the first run.
fn run_with_diagnostics(
    cli: &Cli,
    source: &RgbaImage,
    params: &Adjustments,
) -> Result<RgbaImage, ExitCode> {
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut first_output = None;
    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (staged, diagnostics) =
            darkroom_pipeline::diagnostics::process_with_diagnostics(source, params, &SystemClock)
                .map_err(|e| {
                    eprintln!("Pipeline error: {e}");
                    ExitCode::FAILURE
                })?;

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return Err(ExitCode::FAILURE);
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        if first_output.is_none() {
            first_output = Some(staged.into_output());
        }
        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    first_output.ok_or(ExitCode::FAILURE)
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> std::time::Duration;

/// Print aggregated statistics across multiple runs.
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let (min, mean, max) = min_mean_max(|d| d.total_duration, all_diagnostics);
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Tone", |d| d.tone.duration),
        ("Sharpen", |d| d.sharpen.duration),
        ("Vignette", |d| d.vignette.duration),
    ];

    for (name, extractor) in stage_extractors {
        let (_, stage_mean, _) = min_mean_max(*extractor, all_diagnostics);
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

/// Minimum, mean, and maximum of an extracted duration, in milliseconds.
#[allow(clippy::cast_precision_loss)]
fn min_mean_max(extract: StageExtractor, all: &[PipelineDiagnostics]) -> (f64, f64, f64) {
    let ms: Vec<f64> = all
        .iter()
        .map(|d| extract(d).as_secs_f64() * 1000.0)
        .collect();
    if ms.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = ms.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = ms.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = ms.iter().sum::<f64>() / ms.len() as f64;
    (min, mean, max)
}
