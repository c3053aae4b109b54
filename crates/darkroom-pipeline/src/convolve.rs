//! Neighborhood convolution for sharpening.
//!
//! [`convolve`] slides a square [`Kernel`] over the R, G, B channels of
//! an RGBA image and writes the weighted sums into a fresh buffer. The
//! source is never mutated, since neighboring output pixels read
//! overlapping input windows.
//!
//! # Border policy
//!
//! Taps that fall outside the image contribute **zero**: the weight at
//! that offset is skipped, with no edge clamping or mirroring. For the
//! sharpening kernel this brightens border pixels (the negative
//! neighbor weights go missing while the `1 + 4w` center stays), which
//! is the established output of this stage and is kept as-is.
//!
//! # Alpha
//!
//! Every output pixel gets alpha 255, whatever the input alpha was.

use image::Rgba;

use crate::kernel::Kernel;
use crate::sample::{clamp, store};
use crate::types::RgbaImage;

/// Convolve the color channels of `image` with `kernel`.
///
/// Each channel sum is clamped to `[0, 255]` and rounded. Output
/// dimensions match the input; output alpha is always 255.
#[must_use = "returns the convolved image"]
pub fn convolve(image: &RgbaImage, kernel: &Kernel) -> RgbaImage {
    let (width, height) = image.dimensions();
    let taps = kernel.taps();

    RgbaImage::from_fn(width, height, |x, y| {
        let mut sum = [0.0f64; 3];
        for &(dx, dy, weight) in &taps {
            let Some(src) = neighbor(image, x, y, dx, dy) else {
                continue;
            };
            for (acc, &sample) in sum.iter_mut().zip(&src.0[..3]) {
                *acc += f64::from(sample) * weight;
            }
        }
        let [r, g, b] = sum.map(|v| store(clamp(v)));
        Rgba([r, g, b, 255])
    })
}

/// Sharpen `image` with the 3x3 kernel for `sharpness`.
///
/// Returns `None` when `sharpness <= 0`, meaning the stage does not
/// run and the caller keeps its current buffer (alpha included).
#[must_use = "returns the sharpened image"]
pub fn sharpen(image: &RgbaImage, sharpness: f64) -> Option<RgbaImage> {
    Kernel::sharpen(sharpness).map(|kernel| convolve(image, &kernel))
}

/// The pixel at `(x + dx, y + dy)`, or `None` if it lies outside the
/// image.
fn neighbor(image: &RgbaImage, x: u32, y: u32, dx: i64, dy: i64) -> Option<&Rgba<u8>> {
    let sx = u32::try_from(i64::from(x) + dx).ok()?;
    let sy = u32::try_from(i64::from(y) + dy).ok()?;
    if sx >= image.width() || sy >= image.height() {
        return None;
    }
    Some(image.get_pixel(sx, sy))
}
