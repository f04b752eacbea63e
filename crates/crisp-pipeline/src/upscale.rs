//! Upscaling to `scale ×` the source resolution.
//!
//! Two strategies, chosen per request:
//!
//! - **Photo**: smooth resampling (bicubic by default) straight to the
//!   target size, for continuous-tone content.
//! - **Anime**: nearest-neighbor resampling, which keeps line boundaries
//!   free of intermediate colors, followed by an edge-preserving
//!   bilateral pass ([`bilateral::EDGE_SMOOTH`]) that removes the
//!   blockiness without softening the edges.
//!
//! The source raster is never modified; a new raster is returned.
//!
//! Photo-mode resampling of a source with any transparency happens on
//! premultiplied color, so the hidden RGB of fully transparent pixels
//! never bleeds into visible neighbors.

use std::fmt;

use image::imageops::FilterType;
use image::{Rgba, Rgba32FImage};
use serde::{Deserialize, Serialize};

use crate::bilateral;
use crate::raster::to_sample;
use crate::types::{Dimensions, PipelineError, RgbaImage};

/// Smallest effective upscale factor. Positive requests below it are
/// clamped up, so the output is never smaller than the source.
pub const MIN_SCALE: f32 = 1.0;

/// Largest accepted upscale factor. Larger requests are clamped.
pub const MAX_SCALE: f32 = 4.0;

/// Largest output raster, in pixels, the upscaler will allocate.
pub const MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

/// Resampling filter used for photo-mode upscaling.
///
/// Ordered from fastest/softest to slowest/sharpest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotoFilter {
    /// Bilinear interpolation: fast, soft.
    Triangle,
    /// Bicubic (Catmull-Rom): good quality for most photos.
    #[default]
    CatmullRom,
    /// Lanczos with 3 lobes: sharpest, may ring on hard edges.
    Lanczos3,
}

impl PhotoFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> FilterType {
        match self {
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for PhotoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Which upscaling strategy ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpscaleStrategy {
    /// Target equals source size; the raster was copied.
    Copy,
    /// Smooth resampling with the given filter.
    Photo(PhotoFilter),
    /// Nearest-neighbor plus bilateral smoothing.
    Anime,
}

impl fmt::Display for UpscaleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => f.write_str("Copy"),
            Self::Photo(filter) => write!(f, "Photo({filter})"),
            Self::Anime => f.write_str("Anime"),
        }
    }
}

/// Validate and clamp a requested scale factor into
/// [`MIN_SCALE`]`..=`[`MAX_SCALE`].
///
/// # Errors
///
/// Returns [`PipelineError::InvalidScale`] if `scale` is zero, negative,
/// or NaN.
pub fn effective_scale(scale: f32) -> Result<f32, PipelineError> {
    // Written to reject NaN as well.
    if !(scale > 0.0) {
        return Err(PipelineError::InvalidScale(scale));
    }
    Ok(scale.clamp(MIN_SCALE, MAX_SCALE))
}

/// Output dimensions for a source size and scale:
/// `(round(width · scale), round(height · scale))`, at least 1x1.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidScale`] for a non-positive scale and
/// [`PipelineError::OutputTooLarge`] if the target exceeds
/// [`MAX_OUTPUT_PIXELS`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn target_dimensions(source: Dimensions, scale: f32) -> Result<Dimensions, PipelineError> {
    let scale = f64::from(effective_scale(scale)?);
    let width = (f64::from(source.width) * scale).round().max(1.0) as u64;
    let height = (f64::from(source.height) * scale).round().max(1.0) as u64;

    if width.saturating_mul(height) > MAX_OUTPUT_PIXELS {
        return Err(PipelineError::OutputTooLarge { width, height });
    }
    // Bounded by MAX_OUTPUT_PIXELS, so both fit in u32.
    Ok(Dimensions::new(
        u32::try_from(width).map_err(|_| PipelineError::OutputTooLarge { width, height })?,
        u32::try_from(height).map_err(|_| PipelineError::OutputTooLarge { width, height })?,
    ))
}

/// Upscale `source` by `scale` using the strategy selected by
/// `anime_mode`.
///
/// Returns the new raster and the strategy that produced it.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidScale`] if `scale <= 0`, and
/// [`PipelineError::OutputTooLarge`] if the target is too large.
pub fn upscale(
    source: &RgbaImage,
    scale: f32,
    anime_mode: bool,
    filter: PhotoFilter,
) -> Result<(RgbaImage, UpscaleStrategy), PipelineError> {
    let target = target_dimensions(Dimensions::of(source), scale)?;

    if target == Dimensions::of(source) {
        return Ok((source.clone(), UpscaleStrategy::Copy));
    }

    let (image, strategy) = if anime_mode {
        let mut nearest =
            image::imageops::resize(source, target.width, target.height, FilterType::Nearest);
        bilateral::bilateral_3x3(&mut nearest, bilateral::EDGE_SMOOTH);
        (nearest, UpscaleStrategy::Anime)
    } else {
        let resized = resize_smooth(source, target, filter.to_image_filter());
        (resized, UpscaleStrategy::Photo(filter))
    };

    log::debug!(
        "upscaled {}x{} -> {}x{} ({strategy})",
        source.width(),
        source.height(),
        target.width,
        target.height,
    );
    Ok((image, strategy))
}

/// Smooth resampling that treats alpha as coverage.
///
/// Opaque sources go straight through `imageops::resize`. Anything else
/// is premultiplied into `[0, 1]` floats, resampled, and divided back out.
pub(crate) fn resize_smooth(
    source: &RgbaImage,
    target: Dimensions,
    filter: FilterType,
) -> RgbaImage {
    if source.pixels().all(|p| p.0[3] == u8::MAX) {
        return image::imageops::resize(source, target.width, target.height, filter);
    }

    let premultiplied = Rgba32FImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b, a] = source.get_pixel(x, y).0.map(|v| f32::from(v) / 255.0);
        Rgba([r * a, g * a, b * a, a])
    });
    let resized = image::imageops::resize(&premultiplied, target.width, target.height, filter);

    RgbaImage::from_fn(target.width, target.height, |x, y| {
        let [r, g, b, a] = resized.get_pixel(x, y).0;
        if a <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        Rgba([
            to_sample(r / a * 255.0),
            to_sample(g / a * 255.0),
            to_sample(b / a * 255.0),
            to_sample(a * 255.0),
        ])
    })
}
