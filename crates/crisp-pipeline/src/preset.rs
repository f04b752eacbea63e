//! Named option presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{EnhancementOptions, PipelineError};
use crate::upscale::PhotoFilter;

/// A named starting point for [`EnhancementOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Balanced settings for photographs.
    Photo,
    /// Flat-color art: anime-mode upscaling, no denoise.
    Artwork,
    /// Scanned text: strong contrast and sharpening.
    Document,
    /// Maximum 4x upscale with gentle tone changes.
    Ultra,
}

impl Preset {
    /// Every preset, in display order.
    pub const ALL: [Self; 4] = [Self::Photo, Self::Artwork, Self::Document, Self::Ultra];

    /// The options this preset stands for.
    #[must_use]
    pub const fn options(self) -> EnhancementOptions {
        let (brightness, contrast, saturation, sharpness, scale, quality) = match self {
            Self::Photo => (1.05, 1.15, 1.1, 1.3, 2.0, 75.0),
            Self::Artwork => (1.0, 1.05, 1.0, 1.2, 2.0, 70.0),
            Self::Document => (1.1, 1.25, 0.95, 1.8, 2.0, 80.0),
            Self::Ultra => (1.02, 1.08, 1.02, 1.4, 4.0, 85.0),
        };
        EnhancementOptions {
            brightness,
            contrast,
            saturation,
            sharpness,
            scale,
            quality,
            denoise: !matches!(self, Self::Artwork),
            preserve_colors: true,
            anime_mode: matches!(self, Self::Artwork),
            photo_filter: PhotoFilter::CatmullRom,
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Artwork => "artwork",
            Self::Document => "document",
            Self::Ultra => "ultra",
        }
    }
}

impl From<Preset> for EnhancementOptions {
    fn from(preset: Preset) -> Self {
        preset.options()
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PipelineError::InvalidOptions(format!("unknown preset {s:?}")))
    }
}
