//! Quality dial: maps the 0-100 `quality` setting onto effective
//! enhancement factors.
//!
//! The dial scales each factor's *deviation from neutral* rather than
//! the factor itself:
//!
//! ```text
//! intensity = 0.1 + 0.9 · (quality / 100)
//! effective = 1 + (requested − 1) · intensity
//! ```
//!
//! So 1.0 stays 1.0 at any quality, quality 100 applies the requested
//! factor exactly, and quality 0 keeps 10% of the requested deviation.
//! `scale`, `denoise`, `preserve_colors`, `anime_mode`, and
//! `photo_filter` pass through unchanged; `denoise` and the sharpening
//! gate are on/off switches, not scaled intensities.

use serde::{Deserialize, Serialize};

use crate::types::EnhancementOptions;
use crate::upscale::PhotoFilter;

/// Intensity at quality 0.
pub const MIN_INTENSITY: f32 = 0.1;

/// Intensity at quality 100.
pub const MAX_INTENSITY: f32 = 1.0;

/// Upper end of the quality dial.
pub const MAX_QUALITY: f32 = 100.0;

/// Enhancement factors after applying the quality dial.
///
/// Computed once per request by [`resolve`]; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveOptions {
    /// Effective brightness factor.
    pub brightness: f32,
    /// Effective contrast factor.
    pub contrast: f32,
    /// Effective saturation factor.
    pub saturation: f32,
    /// Effective sharpness factor.
    pub sharpness: f32,
    /// Upscale factor, unchanged from the request.
    pub scale: f32,
    /// Denoise switch, unchanged from the request.
    pub denoise: bool,
    /// Conservative-mode switch, unchanged from the request.
    pub preserve_colors: bool,
    /// Anime-mode switch, unchanged from the request.
    pub anime_mode: bool,
    /// Photo-mode resampler, unchanged from the request.
    pub photo_filter: PhotoFilter,
    /// The intensity the factors were scaled by.
    pub intensity: f32,
}

/// Clamp the dial to `0..=100`. A non-finite dial counts as full
/// quality.
#[must_use]
pub fn clamp_quality(quality: f32) -> f32 {
    if quality.is_finite() {
        quality.clamp(0.0, MAX_QUALITY)
    } else {
        MAX_QUALITY
    }
}

/// Intensity multiplier for a quality dial position.
#[must_use]
pub fn intensity(quality: f32) -> f32 {
    let q = clamp_quality(quality) / MAX_QUALITY;
    (MAX_INTENSITY - MIN_INTENSITY).mul_add(q, MIN_INTENSITY)
}

/// Scale one factor's deviation from neutral. A non-finite factor is
/// treated as neutral.
#[must_use]
pub fn scale_factor(requested: f32, intensity: f32) -> f32 {
    if requested.is_finite() {
        (requested - 1.0).mul_add(intensity, 1.0)
    } else {
        1.0
    }
}

/// Compute the effective options for one request.
#[must_use]
pub fn resolve(options: &EnhancementOptions) -> EffectiveOptions {
    let intensity = intensity(options.quality);
    let effective = EffectiveOptions {
        brightness: scale_factor(options.brightness, intensity),
        contrast: scale_factor(options.contrast, intensity),
        saturation: scale_factor(options.saturation, intensity),
        sharpness: scale_factor(options.sharpness, intensity),
        scale: options.scale,
        denoise: options.denoise,
        preserve_colors: options.preserve_colors,
        anime_mode: options.anime_mode,
        photo_filter: options.photo_filter,
        intensity,
    };
    log::trace!("quality {} -> {effective:?}", options.quality);
    effective
}
