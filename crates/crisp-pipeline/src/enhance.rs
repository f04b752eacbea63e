//! Tone and detail enhancement on an upscaled raster.
//!
//! Runs in one of two modes, picked by `preserve_colors`:
//!
//! | step       | conservative                       | standard                          |
//! |------------|------------------------------------|-----------------------------------|
//! | brightness | `[0.8, 1.3]`, skipped within ±0.01 | combined with contrast, `[0.5, 2]`|
//! | contrast   | `[0.8, 1.4]`, skipped within ±0.01 | (combined pass)                   |
//! | saturation | never                              | `[0, 2]`, always                  |
//! | sharpen    | mild kernel, amount ≤ 0.5          | unsharp kernel, amount ≤ 1.0      |
//! | denoise    | range σ 10, 70% original kept      | range σ 25, full replacement      |
//!
//! Steps run in the order listed. Sharpening runs only when the
//! effective sharpness exceeds 1.0, denoise only when requested.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::bilateral::{self, BilateralParams};
use crate::quality::EffectiveOptions;
use crate::raster;
use crate::sharpen::{self, Kernel3x3};
use crate::tone;
use crate::types::{PipelineError, RgbaImage};

/// Deviation from 1.0 below which a conservative tone step is skipped.
pub const TONE_GATE: f32 = 0.01;

/// Enhancement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnhanceMode {
    /// Narrow bands and no saturation change, so colors never clip or
    /// invert.
    Conservative,
    /// Wider bands, saturation, stronger sharpening and denoise.
    Standard,
}

impl EnhanceMode {
    /// Mode for a `preserve_colors` switch.
    #[must_use]
    pub const fn from_preserve_colors(preserve_colors: bool) -> Self {
        if preserve_colors {
            Self::Conservative
        } else {
            Self::Standard
        }
    }

    const fn sharpen_kernel(self) -> &'static Kernel3x3 {
        match self {
            Self::Conservative => &sharpen::MILD_KERNEL,
            Self::Standard => &sharpen::UNSHARP_KERNEL,
        }
    }

    const fn max_sharpen_amount(self) -> f32 {
        match self {
            Self::Conservative => 0.5,
            Self::Standard => 1.0,
        }
    }

    const fn denoise_params(self) -> BilateralParams {
        match self {
            Self::Conservative => bilateral::MILD_DENOISE,
            Self::Standard => bilateral::FULL_DENOISE,
        }
    }
}

impl fmt::Display for EnhanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conservative => f.write_str("Conservative"),
            Self::Standard => f.write_str("Standard"),
        }
    }
}

/// Conservative brightness band.
const CONSERVATIVE_BRIGHTNESS: RangeInclusive<f32> = 0.8..=1.3;
/// Conservative contrast band.
const CONSERVATIVE_CONTRAST: RangeInclusive<f32> = 0.8..=1.4;
/// Standard brightness and contrast band.
const STANDARD_TONE: RangeInclusive<f32> = 0.5..=2.0;
/// Standard saturation band.
const STANDARD_SATURATION: RangeInclusive<f32> = 0.0..=2.0;

/// Which steps actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct AppliedSteps {
    /// Brightness was applied (alone or in the combined pass).
    pub brightness: bool,
    /// Contrast was applied (alone or in the combined pass).
    pub contrast: bool,
    /// Saturation was applied.
    pub saturation: bool,
    /// Sharpening was applied.
    pub sharpen: bool,
    /// Denoise was applied.
    pub denoise: bool,
}

/// Result of one enhancement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceReport {
    /// Mode the pass ran in.
    pub mode: EnhanceMode,
    /// Steps that ran.
    pub applied: AppliedSteps,
}

fn outside_gate(factor: f32) -> bool {
    (factor - 1.0).abs() > TONE_GATE
}

/// Enhance `image` in place using already-resolved options.
///
/// Dimensions never change. Alpha is never modified.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if `image` violates the
/// raster invariant.
pub fn enhance_in_place(
    image: &mut RgbaImage,
    options: &EffectiveOptions,
) -> Result<EnhanceReport, PipelineError> {
    raster::validate(image)?;

    let mode = EnhanceMode::from_preserve_colors(options.preserve_colors);
    let mut applied = AppliedSteps::default();

    match mode {
        EnhanceMode::Conservative => {
            if outside_gate(options.brightness) {
                tone::apply_brightness(image, options.brightness, &CONSERVATIVE_BRIGHTNESS);
                applied.brightness = true;
            }
            if outside_gate(options.contrast) {
                tone::apply_contrast(image, options.contrast, &CONSERVATIVE_CONTRAST);
                applied.contrast = true;
            }
        }
        EnhanceMode::Standard => {
            tone::apply_brightness_contrast(
                image,
                options.brightness,
                options.contrast,
                &STANDARD_TONE,
            );
            tone::apply_saturation(image, options.saturation, &STANDARD_SATURATION);
            applied.brightness = true;
            applied.contrast = true;
            applied.saturation = true;
        }
    }

    if options.sharpness > 1.0 {
        let amount = sharpen::blend_amount(options.sharpness, mode.max_sharpen_amount());
        sharpen::sharpen(image, mode.sharpen_kernel(), amount);
        applied.sharpen = true;
    }

    if options.denoise {
        bilateral::bilateral_3x3(image, mode.denoise_params());
        applied.denoise = true;
    }

    log::debug!(
        "enhanced {}x{} in {mode} mode: {applied:?}",
        image.width(),
        image.height(),
    );
    Ok(EnhanceReport { mode, applied })
}

/// Enhance a copy of `image`, leaving the input untouched.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if `image` violates the
/// raster invariant.
pub fn enhance(
    image: &RgbaImage,
    options: &EffectiveOptions,
) -> Result<(RgbaImage, EnhanceReport), PipelineError> {
    let mut out = image.clone();
    let report = enhance_in_place(&mut out, options)?;
    Ok((out, report))
}
