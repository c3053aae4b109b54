//! Image decoding to an 8-bit RGBA buffer.
//!
//! Accepts encoded image bytes (PNG, JPEG, BMP, WebP) and produces the
//! interleaved RGBA buffer every pipeline stage works on. Images with
//! other color types (grayscale, 16-bit, no alpha) are converted; a
//! missing alpha channel becomes fully opaque.

use crate::types::{PipelineError, RgbaImage};

/// Decode encoded image bytes into an RGBA buffer.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.into_rgba8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::{ImageEncoder, Rgb, RgbImage, Rgba};

    fn encode_png(raw: &[u8], width: u32, height: u32, color: image::ExtendedColorType) -> Vec<u8> {
        let mut buf = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buf)
            .write_image(raw, width, height, color)
            .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_rgba(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgba(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn rgba_png_round_trips() {
        let img = RgbaImage::from_fn(3, 2, |x, y| {
            Rgba([
                u8::try_from(x * 50).unwrap(),
                u8::try_from(y * 90).unwrap(),
                7,
                u8::try_from(100 + x).unwrap(),
            ])
        });
        let png = encode_png(img.as_raw(), 3, 2, image::ExtendedColorType::Rgba8);
        assert_eq!(decode_rgba(&png).unwrap(), img);
    }

    #[test]
    fn rgb_png_gets_opaque_alpha() {
        let img = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let png = encode_png(img.as_raw(), 2, 2, image::ExtendedColorType::Rgb8);
        let decoded = decode_rgba(&png).unwrap();
        assert!(decoded.pixels().all(|px| px.0 == [10, 20, 30, 255]));
    }
}
