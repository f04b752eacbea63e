//! Shared types for the crisp enhancement pipeline.

use serde::{Deserialize, Serialize};

use crate::upscale::PhotoFilter;

/// Re-export `RgbaImage` so downstream crates can reference raster data
/// without depending on `image` directly.
pub use image::RgbaImage;

/// An in-memory RGBA8 pixel grid: interleaved R, G, B, A samples,
/// row-major, top to bottom.
///
/// A valid buffer has non-zero width and height and exactly
/// `width * height * 4` samples. See [`crate::raster::validate`].
pub type RasterBuffer = RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an existing raster.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// One enhancement request, as set by the user's sliders or a
/// [`Preset`](crate::Preset).
///
/// Multiplicative factors use 1.0 as neutral. Out-of-range values are
/// clamped by the stage that consumes them rather than rejected; the only
/// hard error is a non-positive `scale`.
///
/// Serialized in camelCase so the browser caller can send the same object
/// it binds to its form controls. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnhancementOptions {
    /// Brightness factor, nominally 0.8 to 1.3.
    pub brightness: f32,

    /// Contrast factor, nominally 0.8 to 1.4.
    pub contrast: f32,

    /// Saturation factor, nominally 0.8 to 1.3. Ignored when
    /// `preserve_colors` is set.
    pub saturation: f32,

    /// Sharpening factor, nominally 1.0 to 2.0. Values at or below 1.0
    /// disable sharpening.
    pub sharpness: f32,

    /// Upscale factor, 1.0 to 4.0.
    pub scale: f32,

    /// Overall enhancement intensity, 0 to 100. Scales how far the
    /// effective factors deviate from neutral.
    pub quality: f32,

    /// Run the edge-preserving denoise pass.
    pub denoise: bool,

    /// Conservative mode: narrow safe bands, no saturation change.
    pub preserve_colors: bool,

    /// Nearest-neighbor upscaling plus edge-preserving smoothing, for
    /// flat-color line art.
    pub anime_mode: bool,

    /// Resampling filter for photo-mode upscaling.
    pub photo_filter: PhotoFilter,
}

impl EnhancementOptions {
    /// Default brightness factor.
    pub const DEFAULT_BRIGHTNESS: f32 = 1.05;
    /// Default contrast factor.
    pub const DEFAULT_CONTRAST: f32 = 1.1;
    /// Default saturation factor.
    pub const DEFAULT_SATURATION: f32 = 1.05;
    /// Default sharpness factor.
    pub const DEFAULT_SHARPNESS: f32 = 1.2;
    /// Default upscale factor.
    pub const DEFAULT_SCALE: f32 = 2.0;
    /// Default quality dial position.
    pub const DEFAULT_QUALITY: f32 = 75.0;

    /// Options that leave pixels untouched: every factor neutral, no
    /// upscaling, no denoise, conservative mode.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 1.0,
            scale: 1.0,
            quality: 100.0,
            denoise: false,
            preserve_colors: true,
            anime_mode: false,
            photo_filter: PhotoFilter::CatmullRom,
        }
    }
}

impl Default for EnhancementOptions {
    fn default() -> Self {
        Self {
            brightness: Self::DEFAULT_BRIGHTNESS,
            contrast: Self::DEFAULT_CONTRAST,
            saturation: Self::DEFAULT_SATURATION,
            sharpness: Self::DEFAULT_SHARPNESS,
            scale: Self::DEFAULT_SCALE,
            quality: Self::DEFAULT_QUALITY,
            denoise: true,
            preserve_colors: true,
            anime_mode: false,
            photo_filter: PhotoFilter::default(),
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The image error variants are
/// serialized as their `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The upscale factor was zero, negative, or NaN.
    #[error("invalid scale factor {0}: must be greater than zero")]
    InvalidScale(f32),

    /// A raster buffer violated the width/height/sample-length invariant.
    #[error("invalid raster buffer: {0}")]
    InvalidBuffer(String),

    /// The upscale target exceeds [`crate::upscale::MAX_OUTPUT_PIXELS`].
    #[error("upscaled image {width}x{height} exceeds the output pixel limit")]
    OutputTooLarge {
        /// Requested output width.
        width: u64,
        /// Requested output height.
        height: u64,
    },

    /// Failed to encode the output image.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    /// Enhancement options could not be parsed at an I/O boundary.
    #[error("invalid enhancement options: {0}")]
    InvalidOptions(String),
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the image variants
/// store their `Display` string. A deserialized image error is rebuilt
/// with an unknown format hint around the original message.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidScale(f32),
    InvalidBuffer(String),
    OutputTooLarge { width: u64, height: u64 },
    ImageEncode(String),
    InvalidOptions(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidScale(s) => PipelineErrorProxy::InvalidScale(*s),
            Self::InvalidBuffer(s) => PipelineErrorProxy::InvalidBuffer(s.clone()),
            Self::OutputTooLarge { width, height } => PipelineErrorProxy::OutputTooLarge {
                width: *width,
                height: *height,
            },
            Self::ImageEncode(e) => PipelineErrorProxy::ImageEncode(e.to_string()),
            Self::InvalidOptions(s) => PipelineErrorProxy::InvalidOptions(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use image::error::{DecodingError, EncodingError, ImageFormatHint};

        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            PipelineErrorProxy::ImageDecode(msg) => Self::ImageDecode(image::ImageError::Decoding(
                DecodingError::new(ImageFormatHint::Unknown, msg),
            )),
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidScale(s) => Self::InvalidScale(s),
            PipelineErrorProxy::InvalidBuffer(s) => Self::InvalidBuffer(s),
            PipelineErrorProxy::OutputTooLarge { width, height } => {
                Self::OutputTooLarge { width, height }
            }
            PipelineErrorProxy::ImageEncode(msg) => Self::ImageEncode(image::ImageError::Encoding(
                EncodingError::new(ImageFormatHint::Unknown, msg),
            )),
            PipelineErrorProxy::InvalidOptions(s) => Self::InvalidOptions(s),
        })
    }
}
