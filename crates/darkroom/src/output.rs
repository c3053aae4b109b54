//! Encoding the adjusted buffer to disk.

use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};

/// Output path used when none is given.
pub const DEFAULT_OUTPUT: &str = "edited_image.png";

/// Whether `format` can store an alpha channel.
///
/// Formats that cannot (JPEG) get the buffer flattened to RGB first,
/// dropping alpha.
const fn stores_alpha(format: ImageFormat) -> bool {
    !matches!(format, ImageFormat::Jpeg)
}

/// Encode `image` to `path`, picking the format from the extension.
///
/// # Errors
///
/// Returns [`image::ImageError`] if the extension is unknown or
/// encoding/writing fails.
pub fn save(image: &RgbaImage, path: &Path) -> Result<(), image::ImageError> {
    let format = ImageFormat::from_path(path)?;
    if stores_alpha(format) {
        image.save_with_format(path, format)
    } else {
        DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save_with_format(path, format)
    }
}
