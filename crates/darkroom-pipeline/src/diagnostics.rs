//! Pipeline diagnostics: timing and pixel statistics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for
//! parameter experimentation and benchmarking.
//! [`process_with_diagnostics`] runs the pipeline and collects them
//! alongside the staged result.
//!
//! Time is read through the [`Clock`] trait so the caller decides the
//! time source. [`SystemClock`] uses the `web-time` crate, which maps to
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::kernel::Kernel;
use crate::pipeline::Pipeline;
use crate::types::{Adjustments, Dimensions, PipelineError, RgbaImage, StagedResult};
use crate::vignette::{Falloff, vignette_factor};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: tone adjustments.
    pub tone: StageDiagnostics,
    /// Stage 2: sharpening convolution (metrics record whether it ran).
    pub sharpen: StageDiagnostics,
    /// Stage 3: vignette.
    pub vignette: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary for the whole run.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Tone stage metrics.
    Tone {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Mean luma of the input, `0.0..=255.0`.
        mean_luma_before: f64,
        /// Mean luma of the output, `0.0..=255.0`.
        mean_luma_after: f64,
        /// Color samples pinned at 0 in the output.
        clipped_black: u64,
        /// Color samples pinned at 255 in the output.
        clipped_white: u64,
    },
    /// Sharpen stage metrics.
    Sharpen {
        /// Whether the convolution ran (`sharpness > 0`).
        applied: bool,
        /// Kernel side length, when applied.
        kernel_side: Option<usize>,
        /// Orthogonal neighbor weight magnitude, when applied.
        neighbor_weight: Option<f64>,
        /// Pixels whose alpha was raised to 255 by the convolution.
        alpha_forced: u64,
    },
    /// Vignette stage metrics.
    Vignette {
        /// Vignette amount.
        amount: f64,
        /// Multiplier at the image corner (smallest for positive amounts).
        corner_factor: f64,
        /// Whether the factor leaves `[0, 1]` somewhere in the image.
        factor_out_of_range: bool,
    },
}

impl StageMetrics {
    /// Tone metrics comparing the stage input and output.
    #[must_use]
    pub fn tone(before: &RgbaImage, after: &RgbaImage) -> Self {
        let (clipped_black, clipped_white) = clipped_samples(after);
        Self::Tone {
            width: after.width(),
            height: after.height(),
            mean_luma_before: mean_luma(before),
            mean_luma_after: mean_luma(after),
            clipped_black,
            clipped_white,
        }
    }

    /// Sharpen metrics for an optional convolution result.
    #[must_use]
    pub fn sharpen(
        input: &RgbaImage,
        output: Option<&RgbaImage>,
        kernel: Option<&Kernel>,
    ) -> Self {
        let alpha_forced = if output.is_some() {
            input.pixels().map(|p| u64::from(p.0[3] != 255)).sum()
        } else {
            0
        };
        Self::Sharpen {
            applied: output.is_some(),
            kernel_side: kernel.map(Kernel::side),
            neighbor_weight: kernel.and_then(|k| k.weight(1, 0)).map(f64::abs),
            alpha_forced,
        }
    }

    /// Vignette metrics for an image and amount.
    #[must_use]
    pub fn vignette(image: &RgbaImage, amount: f64) -> Self {
        let falloff = Falloff::new(image.width(), image.height());
        let corner_factor = vignette_factor(falloff, 0, 0, amount);
        let factor_out_of_range = !image.is_empty() && !(0.0..=1.0).contains(&corner_factor);
        Self::Vignette {
            amount,
            corner_factor,
            factor_out_of_range,
        }
    }
}

/// High-level summary for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Whether the sharpening convolution ran.
    pub sharpened: bool,
    /// Mean luma of the final output.
    pub final_mean_luma: f64,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Tone", &self.tone),
            ("Sharpen", &self.sharpen),
            ("Vignette", &self.vignette),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Sharpened: {}  |  Final mean luma: {:.1}",
            if self.summary.sharpened { "yes" } else { "no" },
            self.summary.final_mean_luma,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Tone {
            width,
            height,
            mean_luma_before,
            mean_luma_after,
            clipped_black,
            clipped_white,
        } => format!(
            "{width}x{height} luma {mean_luma_before:.1}->{mean_luma_after:.1} clipped black={clipped_black} white={clipped_white}",
        ),
        StageMetrics::Sharpen {
            applied: false, ..
        } => "skipped".to_string(),
        StageMetrics::Sharpen {
            kernel_side,
            neighbor_weight,
            alpha_forced,
            ..
        } => format!(
            "{side}x{side} kernel w={weight:.3} alpha_forced={alpha_forced}",
            side = kernel_side.unwrap_or(0),
            weight = neighbor_weight.unwrap_or(0.0),
        ),
        StageMetrics::Vignette {
            amount,
            corner_factor,
            factor_out_of_range,
        } => format!(
            "amount={amount:.1} corner_factor={corner_factor:.3}{}",
            if *factor_out_of_range {
                " (unclamped)"
            } else {
                ""
            },
        ),
    }
}

/// Mean Rec. 601 luma over all pixels (`0.299 R + 0.587 G + 0.114 B`).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean_luma(image: &RgbaImage) -> f64 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0.0;
    }
    let total: f64 = image
        .pixels()
        .map(|p| {
            let [r, g, b, _] = p.0;
            0.114f64.mul_add(
                f64::from(b),
                0.299f64.mul_add(f64::from(r), 0.587 * f64::from(g)),
            )
        })
        .sum();
    total / count as f64
}

/// Count color samples at 0 and at 255.
pub(crate) fn clipped_samples(image: &RgbaImage) -> (u64, u64) {
    image
        .pixels()
        .flat_map(|p| p.0.into_iter().take(3))
        .fold((0, 0), |(black, white), v| {
            (black + u64::from(v == 0), white + u64::from(v == 255))
        })
}

/// Run the pipeline, timing every stage.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if any control is
/// non-finite.
pub fn process_with_diagnostics<C: Clock>(
    source: &RgbaImage,
    params: &Adjustments,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let toned = Pipeline::new(source.clone(), *params).tone()?;
    let tone = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::tone(source, toned.toned()),
    };

    let t = clock.now();
    let sharpened = toned.sharpen();
    let sharpen = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::sharpen(
            sharpened.toned(),
            sharpened.sharpened(),
            sharpened.kernel(),
        ),
    };

    let t = clock.now();
    let vignetted = sharpened.vignette();
    let vignette = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::vignette(vignetted.vignetted(), params.vignette),
    };

    let staged = vignetted.into_result();
    let total_duration = clock.elapsed(&start);

    let dimensions = Dimensions::of(&staged.vignetted);
    let summary = PipelineSummary {
        image_width: dimensions.width,
        image_height: dimensions.height,
        pixel_count: dimensions.pixel_count(),
        sharpened: staged.sharpened.is_some(),
        final_mean_luma: mean_luma(&staged.vignetted),
    };

    tracing::debug!(
        total_ms = duration_ms(total_duration),
        sharpened = summary.sharpened,
        "pipeline complete"
    );

    Ok((
        staged,
        PipelineDiagnostics {
            tone,
            sharpen,
            vignette,
            total_duration,
            summary,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Clock that advances one millisecond per reading.
    struct TickClock(std::cell::Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.0.get() - since)
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn mean_luma_of_white_is_255() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([255, 255, 255, 0]));
        assert!((mean_luma(&img) - 255.0).abs() < 1e-9);
    }

    #[test]
    fn mean_luma_of_empty_is_zero() {
        assert!(mean_luma(&RgbaImage::new(0, 4)).abs() < f64::EPSILON);
    }

    #[test]
    fn clipped_samples_ignores_alpha() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 255, 10, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        assert_eq!(clipped_samples(&img), (4, 1));
    }

    #[test]
    fn sharpen_metrics_skipped() {
        let img = RgbaImage::new(2, 2);
        assert_eq!(
            StageMetrics::sharpen(&img, None, None),
            StageMetrics::Sharpen {
                applied: false,
                kernel_side: None,
                neighbor_weight: None,
                alpha_forced: 0,
            }
        );
    }

    #[test]
    fn sharpen_metrics_count_forced_alpha() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        img.put_pixel(0, 0, Rgba([1, 2, 3, 10]));
        let kernel = Kernel::sharpen(5.0).unwrap();
        let out = crate::convolve::convolve(&img, &kernel);
        let StageMetrics::Sharpen {
            applied,
            kernel_side,
            neighbor_weight,
            alpha_forced,
        } = StageMetrics::sharpen(&img, Some(&out), Some(&kernel))
        else {
            unreachable!("sharpen metrics constructor returns Sharpen");
        };
        assert!(applied);
        assert_eq!(kernel_side, Some(3));
        assert!((neighbor_weight.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(alpha_forced, 1);
    }

    #[test]
    fn vignette_metrics_flag_unclamped_factor() {
        let img = RgbaImage::new(4, 4);
        assert!(matches!(
            StageMetrics::vignette(&img, 150.0),
            StageMetrics::Vignette {
                factor_out_of_range: true,
                ..
            }
        ));
        assert!(matches!(
            StageMetrics::vignette(&img, 50.0),
            StageMetrics::Vignette {
                factor_out_of_range: false,
                ..
            }
        ));
        assert!(matches!(
            StageMetrics::vignette(&img, -20.0),
            StageMetrics::Vignette {
                factor_out_of_range: true,
                ..
            }
        ));
    }

    #[test]
    fn process_with_diagnostics_matches_process() {
        let src = RgbaImage::from_fn(6, 4, |x, y| {
            Rgba([
                u8::try_from(x * 40).unwrap(),
                u8::try_from(y * 60).unwrap(),
                90,
                255,
            ])
        });
        let params = Adjustments {
            exposure: 10.0,
            sharpness: 2.0,
            vignette: 25.0,
            ..Adjustments::default()
        };
        let clock = TickClock(std::cell::Cell::new(0));
        let (staged, diag) = process_with_diagnostics(&src, &params, &clock).unwrap();
        assert_eq!(staged.vignetted, crate::process(&src, &params).unwrap());
        assert!(diag.summary.sharpened);
        assert_eq!(diag.summary.pixel_count, 24);
        assert!(diag.total_duration >= diag.tone.duration);
        assert!(matches!(diag.tone.metrics, StageMetrics::Tone { .. }));
        assert!(matches!(
            diag.sharpen.metrics,
            StageMetrics::Sharpen { applied: true, .. }
        ));
        assert!(matches!(diag.vignette.metrics, StageMetrics::Vignette { .. }));
    }

    #[test]
    fn process_with_diagnostics_rejects_nan() {
        let params = Adjustments {
            black: f64::NAN,
            ..Adjustments::default()
        };
        let result = process_with_diagnostics(&RgbaImage::new(2, 2), &params, &SystemClock);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidParameter { name: "black", .. })
        ));
    }

    #[test]
    fn report_produces_nonempty_string() {
        let diag = PipelineDiagnostics {
            tone: StageDiagnostics {
                duration: Duration::from_millis(10),
                metrics: StageMetrics::Tone {
                    width: 100,
                    height: 80,
                    mean_luma_before: 100.0,
                    mean_luma_after: 120.0,
                    clipped_black: 3,
                    clipped_white: 9,
                },
            },
            sharpen: StageDiagnostics {
                duration: Duration::from_millis(30),
                metrics: StageMetrics::Sharpen {
                    applied: true,
                    kernel_side: Some(3),
                    neighbor_weight: Some(0.4),
                    alpha_forced: 0,
                },
            },
            vignette: StageDiagnostics {
                duration: Duration::from_millis(5),
                metrics: StageMetrics::Vignette {
                    amount: 120.0,
                    corner_factor: -0.2,
                    factor_out_of_range: true,
                },
            },
            total_duration: Duration::from_millis(45),
            summary: PipelineSummary {
                image_width: 100,
                image_height: 80,
                pixel_count: 8000,
                sharpened: true,
                final_mean_luma: 110.0,
            },
        };

        let report = diag.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("3x3 kernel"));
        assert!(report.contains("(unclamped)"));
    }

    #[test]
    fn diagnostics_serde_round_trip() {
        let diag = StageDiagnostics {
            duration: Duration::from_micros(1500),
            metrics: StageMetrics::Sharpen {
                applied: false,
                kernel_side: None,
                neighbor_weight: None,
                alpha_forced: 0,
            },
        };
        let json = serde_json::to_string(&diag).unwrap();
        let back: StageDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.duration, diag.duration);
        assert_eq!(back.metrics, diag.metrics);
    }
}
