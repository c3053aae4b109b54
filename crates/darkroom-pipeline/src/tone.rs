//! Per-pixel tone adjustments.
//!
//! This is the first step in the pipeline. Every pixel's R, G, B
//! samples pass through six sub-steps in a fixed order:
//!
//! 1. exposure: `v * (1 + exposure/100)`
//! 2. black level: `v - black`
//! 3. shadows: `v + shadows`
//! 4. contrast: `(v - 128) * (contrast/100 + 1) + 128`
//! 5. color temperature: `r + t`, `b - t` (green unaffected)
//! 6. saturation: `avg + (v - avg) * (1 + saturation/100)` with
//!    `avg = (r + g + b) / 3` taken after step 5
//!
//! Each sub-step clamps to `[0, 255]` before the next one reads the
//! value, so intermediate overflow is lost for good. Samples stay
//! real-valued between sub-steps and are rounded only when stored.
//! Alpha is never touched.

use crate::sample::{clamp, store};
use crate::types::{Adjustments, RgbaImage};

/// Precomputed multipliers for one parameter set.
#[derive(Debug, Clone, Copy)]
struct ToneFactors {
    exposure: f64,
    black: f64,
    shadows: f64,
    contrast: f64,
    temperature: f64,
    saturation: f64,
}

impl ToneFactors {
    fn new(params: &Adjustments) -> Self {
        Self {
            exposure: 1.0 + params.exposure / 100.0,
            black: params.black,
            shadows: params.shadows,
            contrast: params.contrast / 100.0 + 1.0,
            temperature: params.color_temperature,
            saturation: 1.0 + params.saturation / 100.0,
        }
    }

    /// Steps 1-4, shared by all three channels.
    // Unfused arithmetic keeps the reference evaluation order.
    #[allow(clippy::suboptimal_flops)]
    fn luminance_steps(self, v: f64) -> f64 {
        let v = clamp(v * self.exposure);
        let v = clamp(v - self.black);
        let v = clamp(v + self.shadows);
        clamp((v - 128.0) * self.contrast + 128.0)
    }

    #[allow(clippy::suboptimal_flops)]
    fn apply(self, [r, g, b]: [u8; 3]) -> [u8; 3] {
        let r = self.luminance_steps(f64::from(r));
        let g = self.luminance_steps(f64::from(g));
        let b = self.luminance_steps(f64::from(b));

        let r = clamp(r + self.temperature);
        let b = clamp(b - self.temperature);

        let avg = (r + g + b) / 3.0;
        let saturate = |v: f64| clamp(avg + (v - avg) * self.saturation);

        [store(saturate(r)), store(saturate(g)), store(saturate(b))]
    }
}

/// Apply the tone sub-steps to a single RGB triple.
#[must_use]
pub fn tone_pixel(rgb: [u8; 3], params: &Adjustments) -> [u8; 3] {
    ToneFactors::new(params).apply(rgb)
}

/// Apply the tone sub-steps to every pixel of `image` in place.
///
/// Dimensions and alpha are preserved.
pub fn apply_tone(image: &mut RgbaImage, params: &Adjustments) {
    let factors = ToneFactors::new(params);
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let [r, g, b] = factors.apply([r, g, b]);
        pixel.0 = [r, g, b, a];
    }
}
