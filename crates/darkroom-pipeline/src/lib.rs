//! darkroom-pipeline: In-memory photo adjustment pipeline (sans-IO).
//!
//! Transforms an 8-bit RGBA pixel buffer through, in fixed order:
//! tone adjustments -> optional sharpening convolution -> vignette.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! buffers and encoded byte slices. Reading and writing files lives in
//! the `darkroom` command-line crate.

pub mod convolve;
pub mod decode;
pub mod diagnostics;
pub mod kernel;
pub mod pipeline;
mod sample;
pub mod scale;
pub mod tone;
pub mod types;
pub mod vignette;

pub use decode::decode_rgba;
pub use kernel::Kernel;
pub use pipeline::{Advance, Pipeline, PipelineStage, Stage};
pub use scale::{ResizeFilter, fit_width};
pub use types::{
    Adjustments, CHANNELS, Dimensions, PipelineError, PixelBuffer, RgbaImage, StagedResult,
};

/// Run the full adjustment pipeline.
///
/// The source buffer is borrowed and never modified; the result is a
/// new buffer of the same dimensions.
///
/// # Pipeline steps
///
/// 1. Validate parameters
/// 2. Tone adjustments (exposure, black, shadows, contrast, color
///    temperature, saturation)
/// 3. Sharpening convolution, only when `sharpness > 0`
/// 4. Vignette
///
/// With all parameters at zero the output equals the input.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if any control is NaN or
/// infinite. No pixel is written in that case.
pub fn process(source: &RgbaImage, params: &Adjustments) -> Result<RgbaImage, PipelineError> {
    // 1. Validate.
    params.validate()?;

    // 2-4 run on a fresh copy of the source.
    Ok(run_stages(source.clone(), params))
}

/// Tone, optional sharpening, then vignette, on an owned buffer.
///
/// `params` must already be validated.
fn run_stages(mut working: RgbaImage, params: &Adjustments) -> RgbaImage {
    // 2. Tone.
    tone::apply_tone(&mut working, params);

    // 3. Optional sharpening replaces the working buffer.
    if let Some(sharpened) = convolve::sharpen(&working, params.sharpness) {
        working = sharpened;
    }

    // 4. Vignette reads the sharpened buffer when there is one.
    vignette::apply_vignette(&mut working, params.vignette);

    tracing::debug!(
        width = working.width(),
        height = working.height(),
        sharpened = params.sharpens(),
        "processed image"
    );
    working
}

/// Run the pipeline on a raw interleaved RGBA byte slice.
///
/// `pixels` must hold exactly `width * height * 4` bytes. The returned
/// vector has the same length and layout.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionsTooLarge`] if the required length
/// overflows `usize`, [`PipelineError::BufferSizeMismatch`] if `pixels`
/// has the wrong length, and [`PipelineError::InvalidParameter`] for
/// non-finite controls. All checks run before any pixel is processed.
pub fn process_raw(
    pixels: &[u8],
    width: u32,
    height: u32,
    params: &Adjustments,
) -> Result<Vec<u8>, PipelineError> {
    let expected = Dimensions { width, height }
        .byte_len()
        .ok_or(PipelineError::DimensionsTooLarge { width, height })?;
    if pixels.len() != expected {
        return Err(PipelineError::BufferSizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }
    params.validate()?;

    let working = RgbaImage::from_raw(width, height, pixels.to_vec()).ok_or(
        PipelineError::BufferSizeMismatch {
            expected,
            actual: pixels.len(),
        },
    )?;
    Ok(run_stages(working, params).into_raw())
}

/// Run the pipeline and keep every intermediate buffer.
///
/// Equivalent to driving [`Pipeline`] through all of its stages.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if any control is
/// non-finite.
pub fn process_staged(
    source: &RgbaImage,
    params: &Adjustments,
) -> Result<StagedResult, PipelineError> {
    Ok(Pipeline::new(source.clone(), *params)
        .tone()?
        .sharpen()
        .vignette()
        .into_result())
}
