//! Scaling a decoded image to the working width.
//!
//! Adjustments run at a fixed working width so that slider feedback
//! stays interactive on large photos. The image is resized so its
//! width equals the target exactly, up or down, and the height follows
//! the aspect ratio (truncated to whole pixels, at least 1).
//!
//! A target width of 0 disables scaling.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RgbaImage;

/// Default working width in pixels.
pub const DEFAULT_WORKING_WIDTH: u32 = 800;

/// Default resampling filter.
pub const DEFAULT_RESIZE_FILTER: ResizeFilter = ResizeFilter::Triangle;

/// Resampling filter used when scaling.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest/best for photos.
    Lanczos3,
}

impl Default for ResizeFilter {
    fn default() -> Self {
        DEFAULT_RESIZE_FILTER
    }
}

impl ResizeFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Height that keeps the aspect ratio of a `width` x `height` image
/// scaled to `target_width`.
///
/// Truncates toward zero and never returns less than 1. A zero source
/// width yields the unchanged height.
#[must_use]
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height;
    }
    let scaled = u64::from(height) * u64::from(target_width) / u64::from(width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Scale `image` to `target_width` pixels wide.
///
/// Returns the (possibly unchanged) buffer and whether a resize
/// actually happened. Images already at the target width are returned
/// as-is, as is any image when `target_width` is 0.
#[must_use]
pub fn fit_width(image: RgbaImage, target_width: u32, filter: ResizeFilter) -> (RgbaImage, bool) {
    let (w, h) = image.dimensions();
    if target_width == 0 || target_width == w || w == 0 {
        return (image, false);
    }

    let target_height = scaled_height(w, h, target_width);
    let resized = image::imageops::resize(
        &image,
        target_width,
        target_height,
        filter.to_image_filter(),
    );
    tracing::debug!(
        from_width = w,
        from_height = h,
        to_width = target_width,
        to_height = target_height,
        %filter,
        "scaled to working width"
    );
    (resized, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba([128, 128, 128, 255]))
    }

    #[test]
    fn default_filter_is_triangle() {
        assert_eq!(ResizeFilter::default(), ResizeFilter::Triangle);
    }

    #[test]
    fn no_resize_when_width_matches() {
        let (result, applied) = fit_width(test_image(800, 600), 800, ResizeFilter::Triangle);
        assert!(!applied);
        assert_eq!(result.dimensions(), (800, 600));
    }

    #[test]
    fn zero_target_keeps_native_size() {
        let (result, applied) = fit_width(test_image(1024, 768), 0, ResizeFilter::Lanczos3);
        assert!(!applied);
        assert_eq!(result.dimensions(), (1024, 768));
    }

    #[test]
    fn downscales_landscape() {
        let (result, applied) = fit_width(test_image(1600, 1200), 800, ResizeFilter::Triangle);
        assert!(applied);
        assert_eq!(result.dimensions(), (800, 600));
    }

    #[test]
    fn upscales_small_image() {
        // Narrower images are enlarged to the working width too.
        let (result, applied) = fit_width(test_image(200, 100), 800, ResizeFilter::Nearest);
        assert!(applied);
        assert_eq!(result.dimensions(), (800, 400));
    }

    #[test]
    fn scaled_height_truncates() {
        // 333 * 800 / 1000 = 266.4
        assert_eq!(scaled_height(1000, 333, 800), 266);
    }

    #[test]
    fn scaled_height_never_zero() {
        assert_eq!(scaled_height(10_000, 1, 800), 1);
    }

    #[test]
    fn scaled_height_zero_width() {
        assert_eq!(scaled_height(0, 5, 800), 5);
    }

    #[test]
    fn filter_display() {
        assert_eq!(ResizeFilter::CatmullRom.to_string(), "CatmullRom");
    }
}
