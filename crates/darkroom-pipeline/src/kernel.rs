//! Square convolution kernels.
//!
//! A [`Kernel`] is an odd-sided square matrix of weights stored
//! row-major. The pipeline only ever builds the 3x3 sharpening kernel
//! (see [`Kernel::sharpen`]), but [`crate::convolve::convolve`] accepts
//! any valid kernel.

use crate::types::PipelineError;

/// Divisor mapping the `sharpness` control to the kernel's neighbor
/// weight.
pub const SHARPNESS_SCALE: f64 = 10.0;

/// An odd-sided square matrix of convolution weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    side: usize,
    weights: Vec<f64>,
}

impl Kernel {
    /// Build a kernel from row-major weights.
    ///
    /// The side length is derived from the weight count.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidKernel`] if `weights` is empty,
    /// its length is not a perfect square, the side is even, or any
    /// weight is non-finite.
    pub fn new(weights: Vec<f64>) -> Result<Self, PipelineError> {
        let side = weights.len().isqrt();
        if side == 0 || side * side != weights.len() {
            return Err(PipelineError::InvalidKernel(format!(
                "{} weights do not form a square",
                weights.len(),
            )));
        }
        if side % 2 == 0 {
            return Err(PipelineError::InvalidKernel(format!(
                "side length {side} is even"
            )));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite()) {
            return Err(PipelineError::InvalidKernel(format!(
                "weight {w} is not finite"
            )));
        }
        Ok(Self { side, weights })
    }

    /// The 3x3 sharpening kernel for a `sharpness` control value.
    ///
    /// ```text
    ///  0  -w   0
    /// -w 1+4w -w
    ///  0  -w   0
    /// ```
    ///
    /// where `w = sharpness / 10`. The weights always sum to 1, so flat
    /// regions are preserved.
    ///
    /// Returns `None` when `sharpness <= 0` (or is NaN): the
    /// convolution stage is skipped entirely in that case.
    #[must_use]
    #[allow(clippy::suboptimal_flops)]
    pub fn sharpen(sharpness: f64) -> Option<Self> {
        if !sharpness.is_finite() || sharpness <= 0.0 {
            return None;
        }
        let w = sharpness / SHARPNESS_SCALE;
        Some(Self {
            side: 3,
            weights: vec![0.0, -w, 0.0, -w, 1.0 + 4.0 * w, -w, 0.0, -w, 0.0],
        })
    }

    /// Side length (always odd).
    #[must_use]
    pub const fn side(&self) -> usize {
        self.side
    }

    /// Distance from the center tap to an edge: `floor(side / 2)`.
    #[must_use]
    pub const fn half(&self) -> usize {
        self.side / 2
    }

    /// Row-major weights.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight at column `cx`, row `cy`.
    ///
    /// Returns `None` if the position is outside the kernel.
    #[must_use]
    pub fn weight(&self, cx: usize, cy: usize) -> Option<f64> {
        if cx >= self.side || cy >= self.side {
            return None;
        }
        self.weights.get(cy * self.side + cx).copied()
    }

    /// Non-zero taps as `(dx, dy, weight)` offsets from the center.
    ///
    /// Zero weights contribute nothing to the sum and are dropped.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn taps(&self) -> Vec<(i64, i64, f64)> {
        let half = self.half() as i64;
        self.weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w != 0.0)
            .map(|(i, &w)| {
                let cx = (i % self.side) as i64;
                let cy = (i / self.side) as i64;
                (cx - half, cy - half, w)
            })
            .collect()
    }
}
