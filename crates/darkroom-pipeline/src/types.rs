//! Shared types for the darkroom adjustment pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hand pixel buffers
/// to the pipeline without depending on `image` directly.
pub use image::RgbaImage;

/// An 8-bit RGBA pixel buffer, R,G,B,A interleaved, row-major.
///
/// The backing `Vec<u8>` always holds exactly `width * height * 4`
/// samples.
pub type PixelBuffer = RgbaImage;

/// Number of interleaved channels per pixel.
pub const CHANNELS: usize = 4;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing buffer.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Required raw buffer length in bytes, or `None` if it does not
    /// fit in `usize`.
    #[must_use]
    pub fn byte_len(self) -> Option<usize> {
        usize::try_from(self.width)
            .ok()?
            .checked_mul(usize::try_from(self.height).ok()?)?
            .checked_mul(CHANNELS)
    }
}

/// The eight named adjustment controls.
///
/// Every control defaults to `0.0`, and the all-zero set is the
/// identity transform. Values are not range-checked: the UI usually
/// restricts them to roughly `-100..=100`, but the pipeline clamps its
/// own outputs rather than its inputs. Only non-finite values are
/// rejected (see [`Adjustments::validate`]).
///
/// Absent fields deserialize as `0.0`, so a partial JSON object such as
/// `{"exposure": 25}` is a valid parameter set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Exposure in percent: each channel is scaled by `1 + exposure/100`.
    pub exposure: f64,

    /// Black level, subtracted from every channel.
    pub black: f64,

    /// Shadow lift, added to every channel.
    pub shadows: f64,

    /// Contrast in percent around the midpoint 128.
    pub contrast: f64,

    /// Warm/cool shift: added to red, subtracted from blue.
    #[serde(alias = "colorTemperature")]
    pub color_temperature: f64,

    /// Saturation in percent relative to the per-pixel channel mean.
    pub saturation: f64,

    /// Sharpening strength. The convolution stage only runs when this
    /// is strictly positive.
    pub sharpness: f64,

    /// Vignette strength in percent at the image corners.
    pub vignette: f64,
}

impl Adjustments {
    /// Field names paired with their values, in pipeline order.
    #[must_use]
    pub const fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("exposure", self.exposure),
            ("black", self.black),
            ("shadows", self.shadows),
            ("contrast", self.contrast),
            ("color_temperature", self.color_temperature),
            ("saturation", self.saturation),
            ("sharpness", self.sharpness),
            ("vignette", self.vignette),
        ]
    }

    /// Returns `true` if every control is zero.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.named().iter().all(|&(_, v)| v == 0.0)
    }

    /// Whether the sharpening convolution will run.
    #[must_use]
    pub fn sharpens(&self) -> bool {
        self.sharpness > 0.0
    }

    /// Reset every control to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check that every control is a finite number.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] naming the first
    /// control that is NaN or infinite.
    pub fn validate(&self) -> Result<(), PipelineError> {
        match self.named().into_iter().find(|(_, v)| !v.is_finite()) {
            Some((name, value)) => Err(PipelineError::InvalidParameter { name, value }),
            None => Ok(()),
        }
    }
}

/// Result of running the pipeline with every intermediate buffer kept.
///
/// `sharpened` is `None` when `params.sharpness <= 0` and the
/// convolution stage was skipped.
///
/// Uses custom `Serialize`/`Deserialize` implementations because
/// `RgbaImage` does not implement serde traits. Buffers are serialized
/// as `(width, height, raw_pixels)` tuples.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Stage 0: the untouched source snapshot.
    pub source: RgbaImage,
    /// Stage 1: tone-adjusted buffer.
    pub toned: RgbaImage,
    /// Stage 2: sharpened buffer (`Some` only when sharpening ran).
    pub sharpened: Option<RgbaImage>,
    /// Stage 3: vignetted buffer, the final output.
    pub vignetted: RgbaImage,
    /// Parameters the run used.
    pub params: Adjustments,
    /// Image dimensions in pixels.
    pub dimensions: Dimensions,
}

impl StagedResult {
    /// The final output buffer.
    #[must_use]
    pub const fn output(&self) -> &RgbaImage {
        &self.vignetted
    }

    /// Consume the result and return the final output buffer.
    #[must_use]
    pub fn into_output(self) -> RgbaImage {
        self.vignetted
    }
}

type RawImage = (u32, u32, Vec<u8>);

fn to_raw(image: &RgbaImage) -> RawImage {
    (image.width(), image.height(), image.as_raw().clone())
}

fn from_raw<E: serde::de::Error>(raw: RawImage, what: &str) -> Result<RgbaImage, E> {
    let (width, height, pixels) = raw;
    let expected = Dimensions { width, height }.byte_len();
    if expected != Some(pixels.len()) {
        return Err(E::custom(format!("invalid {what} buffer dimensions")));
    }
    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| E::custom(format!("invalid {what} buffer dimensions")))
}

/// Serde-compatible proxy for `StagedResult`.
#[derive(Serialize, Deserialize)]
struct StagedResultProxy {
    source: RawImage,
    toned: RawImage,
    sharpened: Option<RawImage>,
    vignetted: RawImage,
    params: Adjustments,
    dimensions: Dimensions,
}

impl Serialize for StagedResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = StagedResultProxy {
            source: to_raw(&self.source),
            toned: to_raw(&self.toned),
            sharpened: self.sharpened.as_ref().map(to_raw),
            vignetted: to_raw(&self.vignetted),
            params: self.params,
            dimensions: self.dimensions,
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StagedResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = StagedResultProxy::deserialize(deserializer)?;
        Ok(Self {
            source: from_raw::<D::Error>(proxy.source, "source")?,
            toned: from_raw::<D::Error>(proxy.toned, "toned")?,
            sharpened: proxy
                .sharpened
                .map(|raw| from_raw::<D::Error>(raw, "sharpened"))
                .transpose()?,
            vignetted: from_raw::<D::Error>(proxy.vignetted, "vignetted")?,
            params: proxy.params,
            dimensions: proxy.dimensions,
        })
    }
}

/// Errors that can occur during pipeline processing.
///
/// Every variant is raised before any pixel is written, so a failed
/// call leaves the caller's buffer untouched.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A raw pixel buffer does not hold exactly `width * height * 4` bytes.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// Required length (`width * height * 4`).
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// `width * height * 4` does not fit in memory addressing.
    #[error("image dimensions {width}x{height} are too large")]
    DimensionsTooLarge {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// An adjustment control is NaN or infinite.
    #[error("adjustment `{name}` must be finite, got {value}")]
    InvalidParameter {
        /// Control name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A convolution kernel is malformed.
    #[error("invalid kernel: {0}")]
    InvalidKernel(String),
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `ImageDecode` stores its `Display` string, and `InvalidParameter`
/// stores an owned name since `&'static str` cannot be deserialized
/// from arbitrary input.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    BufferSizeMismatch {
        expected: usize,
        actual: usize,
    },
    DimensionsTooLarge {
        width: u32,
        height: u32,
    },
    InvalidParameter {
        name: String,
        value: f64,
    },
    InvalidKernel(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::BufferSizeMismatch { expected, actual } => {
                PipelineErrorProxy::BufferSizeMismatch {
                    expected: *expected,
                    actual: *actual,
                }
            }
            Self::DimensionsTooLarge { width, height } => PipelineErrorProxy::DimensionsTooLarge {
                width: *width,
                height: *height,
            },
            Self::InvalidParameter { name, value } => PipelineErrorProxy::InvalidParameter {
                name: (*name).to_string(),
                value: *value,
            },
            Self::InvalidKernel(s) => PipelineErrorProxy::InvalidKernel(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep the message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::ImageDecode(image::ImageError::IoError(std::io::Error::other(msg)))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::BufferSizeMismatch { expected, actual } => {
                Self::BufferSizeMismatch { expected, actual }
            }
            PipelineErrorProxy::DimensionsTooLarge { width, height } => {
                Self::DimensionsTooLarge { width, height }
            }
            PipelineErrorProxy::InvalidParameter { name, value } => Self::InvalidParameter {
                name: Adjustments::default()
                    .named()
                    .into_iter()
                    .map(|(known, _)| known)
                    .find(|known| *known == name)
                    .ok_or_else(|| {
                        <D::Error as serde::de::Error>::custom(format!(
                            "unknown adjustment `{name}`"
                        ))
                    })?,
                value,
            },
            PipelineErrorProxy::InvalidKernel(s) => Self::InvalidKernel(s),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Dimensions tests ---

    #[test]
    fn dimensions_byte_len() {
        let d = Dimensions {
            width: 3,
            height: 2,
        };
        assert_eq!(d.byte_len(), Some(24));
        assert_eq!(d.pixel_count(), 6);
    }

    #[test]
    fn dimensions_of_image() {
        let img = RgbaImage::new(7, 5);
        assert_eq!(
            Dimensions::of(&img),
            Dimensions {
                width: 7,
                height: 5
            }
        );
    }

    // --- Adjustments tests ---

    #[test]
    fn adjustments_default_is_identity() {
        let params = Adjustments::default();
        assert!(params.is_identity());
        assert!(!params.sharpens());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn adjustments_reset_zeroes_everything() {
        let mut params = Adjustments {
            exposure: 20.0,
            vignette: -40.0,
            sharpness: 3.0,
            ..Adjustments::default()
        };
        assert!(!params.is_identity());
        params.reset();
        assert_eq!(params, Adjustments::default());
    }

    #[test]
    fn negative_sharpness_does_not_sharpen() {
        let params = Adjustments {
            sharpness: -5.0,
            ..Adjustments::default()
        };
        assert!(!params.sharpens());
    }

    #[test]
    fn validate_rejects_nan() {
        let params = Adjustments {
            contrast: f64::NAN,
            ..Adjustments::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidParameter {
                name: "contrast",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_infinity() {
        let params = Adjustments {
            vignette: f64::INFINITY,
            ..Adjustments::default()
        };
        assert!(matches!(
            params.validate(),
            Err(PipelineError::InvalidParameter {
                name: "vignette",
                ..
            })
        ));
    }

    #[test]
    fn validate_accepts_out_of_slider_range() {
        let params = Adjustments {
            exposure: 1000.0,
            black: -500.0,
            ..Adjustments::default()
        };
        assert!(params.validate().is_ok());
    }

    // --- PipelineError tests ---

    #[test]
    fn error_buffer_size_display() {
        let err = PipelineError::BufferSizeMismatch {
            expected: 16,
            actual: 15,
        };
        assert_eq!(err.to_string(), "pixel buffer holds 15 bytes, expected 16");
    }

    #[test]
    fn error_invalid_parameter_display() {
        let err = PipelineError::InvalidParameter {
            name: "exposure",
            value: f64::NAN,
        };
        assert_eq!(err.to_string(), "adjustment `exposure` must be finite, got NaN");
    }

    // --- Serde tests ---

    #[test]
    fn adjustments_partial_json_defaults_to_zero() {
        let params: Adjustments = serde_json::from_str(r#"{"exposure": 25}"#).unwrap();
        assert_eq!(
            params,
            Adjustments {
                exposure: 25.0,
                ..Adjustments::default()
            }
        );
    }

    #[test]
    fn adjustments_accepts_camel_case_temperature() {
        let params: Adjustments =
            serde_json::from_str(r#"{"colorTemperature": -12.5}"#).unwrap();
        assert!((params.color_temperature + 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn staged_result_serde_round_trip() {
        let staged = StagedResult {
            source: RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 128])),
            toned: RgbaImage::from_pixel(2, 2, image::Rgba([20, 40, 60, 128])),
            sharpened: Some(RgbaImage::from_pixel(2, 2, image::Rgba([25, 45, 65, 255]))),
            vignetted: RgbaImage::from_pixel(2, 2, image::Rgba([15, 30, 45, 255])),
            params: Adjustments {
                sharpness: 1.0,
                ..Adjustments::default()
            },
            dimensions: Dimensions {
                width: 2,
                height: 2,
            },
        };

        let json = serde_json::to_string(&staged).unwrap();
        let deserialized: StagedResult = serde_json::from_str(&json).unwrap();

        assert_eq!(staged.source, deserialized.source);
        assert_eq!(staged.toned, deserialized.toned);
        assert_eq!(staged.sharpened, deserialized.sharpened);
        assert_eq!(staged.vignetted, deserialized.vignetted);
        assert_eq!(staged.params, deserialized.params);
        assert_eq!(staged.dimensions, deserialized.dimensions);
    }

    #[test]
    fn staged_result_rejects_truncated_buffer() {
        let json = r#"{
            "source": [2, 2, [0, 0, 0]],
            "toned": [1, 1, [0, 0, 0, 0]],
            "sharpened": null,
            "vignetted": [1, 1, [0, 0, 0, 0]],
            "params": {},
            "dimensions": {"width": 2, "height": 2}
        }"#;
        let result: Result<StagedResult, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn pipeline_error_serde_round_trip_invalid_parameter() {
        let err = PipelineError::InvalidParameter {
            name: "sharpness",
            value: 1.5,
        };
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            PipelineError::InvalidParameter {
                name: "sharpness",
                ..
            }
        ));
    }

    #[test]
    fn pipeline_error_serde_round_trip_image_decode_keeps_message() {
        let err = PipelineError::ImageDecode(image::ImageError::IoError(std::io::Error::other(
            "truncated header",
        )));
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(deserialized, PipelineError::ImageDecode(_)));
        assert!(deserialized.to_string().contains("truncated header"));
    }

    #[test]
    fn pipeline_error_serde_round_trip_buffer_size() {
        let err = PipelineError::BufferSizeMismatch {
            expected: 8,
            actual: 3,
        };
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            PipelineError::BufferSizeMismatch {
                expected: 8,
                actual: 3
            }
        ));
    }
}
