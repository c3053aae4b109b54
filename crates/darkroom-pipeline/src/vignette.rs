//! Radial vignette falloff.
//!
//! Each pixel's R, G, B are multiplied by
//!
//! ```text
//! factor = 1 - (amount / 100) * (distance / max_distance)
//! ```
//!
//! where `distance` is measured from the image center
//! `(width / 2, height / 2)` and `max_distance` is the center-to-corner
//! distance. A pixel lying exactly on the center (even dimensions) is
//! untouched and the factor falls off linearly toward the corners.
//!
//! # Unclamped factor
//!
//! The factor itself is never clamped. With `amount > 100` it goes
//! negative near the corners, and with `amount < 0` it exceeds 1. The
//! only bound applied is the 8-bit store, which saturates at 0 and 255;
//! there is no explicit clamp step as in the tone and convolution
//! stages. See [`vignette_factor`].

use crate::sample::store;
use crate::types::RgbaImage;

/// Center point and center-to-corner distance for an image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Falloff {
    center_x: f64,
    center_y: f64,
    max_distance: f64,
}

impl Falloff {
    /// Geometry for a `width` x `height` image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let center_x = f64::from(width) / 2.0;
        let center_y = f64::from(height) / 2.0;
        Self {
            center_x,
            center_y,
            max_distance: euclid(center_x, center_y),
        }
    }

    /// Distance from the image center to pixel `(x, y)`.
    #[must_use]
    pub fn distance(self, x: u32, y: u32) -> f64 {
        euclid(f64::from(x) - self.center_x, f64::from(y) - self.center_y)
    }

    /// Center-to-corner distance.
    #[must_use]
    pub const fn max_distance(self) -> f64 {
        self.max_distance
    }
}

// Must stay bit-identical to sqrt(dx^2 + dy^2); hypot rounds differently.
#[allow(clippy::imprecise_flops, clippy::suboptimal_flops)]
fn euclid(dx: f64, dy: f64) -> f64 {
    (dx * dx + dy * dy).sqrt()
}

/// Multiplier applied to pixel `(x, y)` for a given vignette `amount`.
///
/// Not clamped: the result can be negative or greater than 1.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn vignette_factor(falloff: Falloff, x: u32, y: u32, amount: f64) -> f64 {
    if falloff.max_distance == 0.0 {
        return 1.0;
    }
    1.0 - (amount / 100.0) * (falloff.distance(x, y) / falloff.max_distance)
}

/// Apply the vignette to every pixel of `image` in place.
///
/// Alpha is untouched. A zero `amount` leaves the image unchanged.
pub fn apply_vignette(image: &mut RgbaImage, amount: f64) {
    let falloff = Falloff::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let factor = vignette_factor(falloff, x, y, amount);
        let [r, g, b, a] = pixel.0;
        pixel.0 = [
            store(f64::from(r) * factor),
            store(f64::from(g) * factor),
            store(f64::from(b) * factor),
            a,
        ];
    }
}
