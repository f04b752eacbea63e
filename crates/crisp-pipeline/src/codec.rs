//! Image decoding and encoding at the pipeline boundary.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an RGBA8
//! [`RasterBuffer`]; serializes the final raster back to PNG (lossless)
//! or JPEG (lossy).
//!
//! This is the first and last step in the pipeline: raw bytes in,
//! raw bytes out. [`preview`] makes the small JPEG thumbnail shown next
//! to the result for a before/after comparison.

use std::fmt;
use std::str::FromStr;

use image::ImageEncoder;
use image::imageops::FilterType;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};

use crate::raster;
use crate::types::{Dimensions, PipelineError, RasterBuffer};
use crate::upscale;

/// Container format for the encoded output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG, full 8-bit RGBA.
    #[default]
    Png,
    /// Lossy JPEG. Alpha is discarded.
    Jpeg,
}

impl OutputFormat {
    /// MIME type of the encoded container.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png => f.write_str("png"),
            Self::Jpeg => f.write_str("jpeg"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            other => Err(format!("unknown output format '{other}' (expected png or jpeg)")),
        }
    }
}

/// Default quality hint for lossy output.
pub const DEFAULT_QUALITY_HINT: u8 = 95;

/// Output container and lossy quality hint for the encode stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncodeSettings {
    /// Output container.
    pub format: OutputFormat,
    /// JPEG quality, 1 to 100. Ignored for PNG.
    pub quality_hint: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality_hint: DEFAULT_QUALITY_HINT,
        }
    }
}

/// Decode raw image bytes into an RGBA8 raster.
///
/// Supports whatever the `image` crate can decode with the enabled
/// features. Grayscale, RGB, and 16-bit sources are converted to RGBA8.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RasterBuffer, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    let rgba = img.into_rgba8();
    log::debug!(
        "decoded {} bytes into {}x{} RGBA",
        bytes.len(),
        rgba.width(),
        rgba.height(),
    );
    Ok(rgba)
}

/// Encode a raster into the requested container.
///
/// `quality_hint` (1 to 100) only affects lossy formats and has no
/// relation to [`EnhancementOptions::quality`](crate::EnhancementOptions::quality).
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if `buffer` violates the
/// raster invariant. Returns [`PipelineError::ImageEncode`] if the
/// underlying encoder fails, which does not happen for a valid buffer.
pub fn encode(
    buffer: &RasterBuffer,
    format: OutputFormat,
    quality_hint: u8,
) -> Result<Vec<u8>, PipelineError> {
    let dims = raster::validate(buffer)?;
    let mut out = Vec::new();

    match format {
        OutputFormat::Png => {
            let encoder = PngEncoder::new(&mut out);
            encoder
                .write_image(
                    buffer.as_raw(),
                    dims.width,
                    dims.height,
                    image::ExtendedColorType::Rgba8,
                )
                .map_err(PipelineError::ImageEncode)?;
        }
        OutputFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(buffer.clone()).into_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut out, quality_hint.clamp(1, 100));
            encoder
                .write_image(
                    rgb.as_raw(),
                    dims.width,
                    dims.height,
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(PipelineError::ImageEncode)?;
        }
    }

    log::debug!(
        "encoded {}x{} raster as {format} ({} bytes)",
        dims.width,
        dims.height,
        out.len(),
    );
    Ok(out)
}

/// Default bounding box edge for previews, in pixels.
pub const DEFAULT_PREVIEW_EDGE: u32 = 400;

/// JPEG quality used for previews.
pub const PREVIEW_QUALITY: u8 = 85;

/// Size of a preview that fits `source` inside a `max_edge` square,
/// keeping the aspect ratio. Small sources are scaled up to fill it.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn preview_dimensions(source: Dimensions, max_edge: u32) -> Dimensions {
    let edge = f64::from(max_edge);
    let ratio = (edge / f64::from(source.width)).min(edge / f64::from(source.height));
    // Never exceeds `max_edge`, so the casts cannot truncate.
    let fit = |side: u32| (f64::from(side) * ratio).round().clamp(1.0, edge) as u32;
    Dimensions::new(fit(source.width), fit(source.height))
}

/// Decode `bytes` and encode a JPEG preview that fits inside a
/// `max_edge` square.
///
/// # Errors
///
/// Returns the [`decode`] errors for bad input and
/// [`PipelineError::InvalidOptions`] if `max_edge` is zero.
pub fn preview(bytes: &[u8], max_edge: u32) -> Result<Vec<u8>, PipelineError> {
    preview_raster(&decode(bytes)?, max_edge)
}

/// Encode a JPEG preview of an already decoded raster.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidOptions`] if `max_edge` is zero and
/// [`PipelineError::InvalidBuffer`] if `source` is malformed.
pub fn preview_raster(source: &RasterBuffer, max_edge: u32) -> Result<Vec<u8>, PipelineError> {
    if max_edge == 0 {
        return Err(PipelineError::InvalidOptions(
            "preview edge must be positive".to_string(),
        ));
    }
    let dims = raster::validate(source)?;
    let target = preview_dimensions(dims, max_edge);
    let thumbnail = if target == dims {
        source.clone()
    } else {
        upscale::resize_smooth(source, target, FilterType::CatmullRom)
    };
    log::debug!(
        "preview {}x{} -> {}x{}",
        dims.width,
        dims.height,
        target.width,
        target.height,
    );
    encode(&thumbnail, OutputFormat::Jpeg, PREVIEW_QUALITY)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RgbaImage;

    #[allow(clippy::cast_possible_truncation)]
    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([
                ((x * 37) % 256) as u8,
                ((y * 53) % 256) as u8,
                (((x + y) * 11) % 256) as u8,
                ((x * y) % 256) as u8,
            ])
        })
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn truncated_png_returns_image_decode_error() {
        let png = encode(&gradient(8, 8), OutputFormat::Png, DEFAULT_QUALITY_HINT).unwrap();
        let result = decode(&png[..png.len() / 2]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let img = gradient(17, 31);
        let png = encode(&img, OutputFormat::Png, DEFAULT_QUALITY_HINT).unwrap();
        let decoded = decode(&png).unwrap();
        assert_eq!(decoded.dimensions(), (17, 31));
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn grayscale_source_decodes_to_rgba() {
        let gray = image::GrayImage::from_pixel(3, 2, image::Luma([90]));
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(gray.as_raw(), 3, 2, image::ExtendedColorType::L8)
            .unwrap();

        let rgba = decode(&buf).unwrap();
        for pixel in rgba.pixels() {
            assert_eq!(pixel.0, [90, 90, 90, 255]);
        }
    }

    #[test]
    fn jpeg_output_decodes_with_same_dimensions() {
        let img = RgbaImage::from_pixel(16, 12, image::Rgba([200, 120, 40, 255]));
        let jpeg = encode(&img, OutputFormat::Jpeg, 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "expected a JPEG SOI marker");

        let decoded = decode(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (16, 12));
        let p = decoded.get_pixel(8, 6).0;
        assert!(
            (i16::from(p[0]) - 200).abs() <= 4,
            "expected red near 200, got {}",
            p[0],
        );
        assert_eq!(p[3], 255, "JPEG output is opaque");
    }

    #[test]
    fn encode_rejects_empty_buffer() {
        let img = RgbaImage::new(0, 0);
        let result = encode(&img, OutputFormat::Png, DEFAULT_QUALITY_HINT);
        assert!(matches!(result, Err(PipelineError::InvalidBuffer(_))));
    }

    #[test]
    fn preview_fits_wide_image_in_box() {
        let png = encode(&gradient(1000, 500), OutputFormat::Png, DEFAULT_QUALITY_HINT).unwrap();
        let jpeg = preview(&png, DEFAULT_PREVIEW_EDGE).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(decode(&jpeg).unwrap().dimensions(), (400, 200));
    }

    #[test]
    fn preview_fits_tall_image_and_rounds() {
        let d = preview_dimensions(Dimensions::new(300, 1000), 400);
        assert_eq!(d, Dimensions::new(120, 400));
        let d = preview_dimensions(Dimensions::new(3, 1000), 400);
        assert_eq!(d, Dimensions::new(1, 400));
    }

    #[test]
    fn preview_scales_small_image_up_to_box() {
        let d = preview_dimensions(Dimensions::new(100, 50), 400);
        assert_eq!(d, Dimensions::new(400, 200));
    }

    #[test]
    fn preview_rejects_zero_edge() {
        let result = preview_raster(&gradient(4, 4), 0);
        assert!(matches!(result, Err(PipelineError::InvalidOptions(_))));
    }

    #[test]
    fn preview_of_empty_input_is_decode_error() {
        assert!(matches!(
            preview(&[], DEFAULT_PREVIEW_EDGE),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn output_format_parses_names() {
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("gif".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
    }
}
