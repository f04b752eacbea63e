//! crisp-pipeline: client-side image upscaling and enhancement (sans-IO).
//!
//! Turns one encoded image into a larger, enhanced PNG through:
//! decode -> quality dial -> upscale -> tone/detail enhance -> encode.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory byte
//! slices and returns bytes. File access lives in the `crisp` CLI and
//! browser messaging in `crisp-worker`.

pub mod bilateral;
pub mod codec;
pub mod diagnostics;
pub mod enhance;
pub mod pipeline;
pub mod preset;
pub mod quality;
pub mod raster;
pub mod sharpen;
pub mod tone;
pub mod types;
pub mod upscale;

pub use codec::{EncodeSettings, OutputFormat};
pub use enhance::{EnhanceMode, EnhanceReport};
pub use pipeline::{Pipeline, StagedResult};
pub use preset::Preset;
pub use quality::EffectiveOptions;
pub use types::{Dimensions, EnhancementOptions, PipelineError, RasterBuffer, RgbaImage};
pub use upscale::{MAX_OUTPUT_PIXELS, MAX_SCALE, MIN_SCALE, PhotoFilter};

/// Enhance one encoded image.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and returns PNG bytes of
/// the upscaled, enhanced image.
///
/// # Pipeline steps
///
/// 1. Decode to RGBA8
/// 2. Scale the factor deviations by the quality dial
/// 3. Upscale by `options.scale` (photo resampling or anime mode)
/// 4. Brightness, contrast, saturation, sharpening, denoise
/// 5. Encode as PNG
///
/// The same bytes and options always produce the same output.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
/// Returns [`PipelineError::InvalidScale`] if `options.scale <= 0`.
/// Returns [`PipelineError::OutputTooLarge`] if the upscaled raster would
/// exceed [`MAX_OUTPUT_PIXELS`].
pub fn enhance(
    image_bytes: &[u8],
    options: &EnhancementOptions,
) -> Result<Vec<u8>, PipelineError> {
    let encoded = Pipeline::new(image_bytes.to_vec(), *options)
        .decode()?
        .resolve_quality()
        .upscale()?
        .enhance()?
        .encode()?;
    Ok(encoded.into_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png_of(img: &RgbaImage) -> Vec<u8> {
        codec::encode(img, OutputFormat::Png, codec::DEFAULT_QUALITY_HINT).unwrap()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn noisy(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 73 + y * 151) % 256) as u8;
            image::Rgba([v, v.wrapping_mul(3), 255 - v, 200])
        })
    }

    #[test]
    fn enhance_empty_input() {
        let result = enhance(&[], &EnhancementOptions::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn enhance_corrupt_input() {
        let result = enhance(&[0xFF, 0x00], &EnhancementOptions::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn enhance_zero_scale_is_invalid() {
        let png = png_of(&noisy(4, 4));
        let options = EnhancementOptions {
            scale: 0.0,
            ..EnhancementOptions::default()
        };
        let result = enhance(&png, &options);
        assert!(matches!(result, Err(PipelineError::InvalidScale(s)) if s == 0.0));
    }

    #[test]
    fn fractional_scale_never_shrinks_output() {
        let png = png_of(&noisy(4, 4));
        let options = EnhancementOptions {
            scale: 0.5,
            ..EnhancementOptions::neutral()
        };
        let out = codec::decode(&enhance(&png, &options).unwrap()).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
    }

    #[test]
    fn pure_red_stays_pure_red() {
        let png = png_of(&RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255])));
        let options = EnhancementOptions {
            scale: 2.0,
            quality: 100.0,
            brightness: 1.05,
            ..EnhancementOptions::default()
        };
        let out = codec::decode(&enhance(&png, &options).unwrap()).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
        for p in out.pixels() {
            assert_eq!(p.0, [255, 0, 0, 255]);
        }
    }

    #[test]
    fn neutral_options_are_pixel_exact() {
        let img = noisy(9, 6);
        let out = codec::decode(&enhance(&png_of(&img), &EnhancementOptions::neutral()).unwrap())
            .unwrap();
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn output_is_png_with_scaled_dimensions() {
        let png = png_of(&noisy(7, 5));
        let options = EnhancementOptions {
            scale: 3.0,
            ..EnhancementOptions::default()
        };
        let out = enhance(&png, &options).unwrap();
        assert_eq!(&out[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = codec::decode(&out).unwrap();
        assert_eq!(decoded.dimensions(), (21, 15));
    }

    #[test]
    fn enhance_is_deterministic() {
        let png = png_of(&noisy(12, 10));
        for preset in Preset::ALL {
            let options = EnhancementOptions {
                // Keep the run small.
                scale: 1.5,
                ..preset.options()
            };
            let first = enhance(&png, &options).unwrap();
            let second = enhance(&png, &options).unwrap();
            assert_eq!(first, second, "{preset}");
        }
    }

    #[test]
    fn alpha_survives_enhancement() {
        let img = RgbaImage::from_pixel(6, 6, image::Rgba([90, 120, 150, 77]));
        let options = EnhancementOptions {
            scale: 1.0,
            preserve_colors: false,
            saturation: 1.5,
            ..EnhancementOptions::default()
        };
        let out = codec::decode(&enhance(&png_of(&img), &options).unwrap()).unwrap();
        assert!(out.pixels().all(|p| p.0[3] == 77));
    }
}
