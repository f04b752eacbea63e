//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::enhance()`], which runs the entire pipeline in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time, for
//! example to show the upscaled raster as a preview before the enhancer
//! runs:
//!
//! ```rust
//! # use crisp_pipeline::{EnhancementOptions, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let encoded = Pipeline::new(png, EnhancementOptions::default())
//!     .decode()?
//!     .resolve_quality()
//!     .upscale()?
//!     .enhance()?
//!     .encode()?;
//!
//! let result = encoded.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying the decoded original and
//! the effective options forward. The caller can inspect the current
//! stage's output via accessor methods at any point.
//!
//! # Memory
//!
//! The decoded original is retained through every stage so the final
//! [`StagedResult`] can offer a before/after comparison. The enhancer
//! works in place on the upscaled raster, so at most one output-sized
//! raster is alive at a time.

use crate::codec::{self, EncodeSettings, OutputFormat};
use crate::diagnostics::StageMetrics;
use crate::enhance::{self, EnhanceReport};
use crate::quality::{self, EffectiveOptions};
use crate::types::{Dimensions, EnhancementOptions, PipelineError, RgbaImage};
use crate::upscale::{self, UpscaleStrategy};

/// Every intermediate of a completed run.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// The decoded source raster.
    pub original: RgbaImage,
    /// Options after the quality dial.
    pub effective: EffectiveOptions,
    /// The upscaled, enhanced raster.
    pub enhanced: RgbaImage,
    /// The encoded output bytes.
    pub encoded: Vec<u8>,
    /// Container the output was encoded as.
    pub format: OutputFormat,
    /// Output dimensions.
    pub dimensions: Dimensions,
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source image bytes and options are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    options: EnhancementOptions,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// The requested options.
    #[must_use]
    pub const fn options(&self) -> &EnhancementOptions {
        &self.options
    }

    /// Decode the source image and advance to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty. Returns [`PipelineError::ImageDecode`] if the image
    /// format is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let original = codec::decode(&self.source)?;
        Ok(Decoded {
            options: self.options,
            original,
            source_len: self.source.len(),
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
#[must_use = "pipeline stages are consumed by advancing; call .resolve_quality() to continue"]
pub struct Decoded {
    options: EnhancementOptions,
    original: RgbaImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded RGBA source.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Apply the quality dial and advance to the [`Resolved`] stage.
    pub fn resolve_quality(self) -> Resolved {
        let effective = quality::resolve(&self.options);
        Resolved {
            options: self.options,
            original: self.original,
            effective,
        }
    }
}

// ───────────────────────── Stage 2: Resolved ─────────────────────────

/// Pipeline state after the quality dial has been applied.
#[must_use = "pipeline stages are consumed by advancing; call .upscale() to continue"]
pub struct Resolved {
    options: EnhancementOptions,
    original: RgbaImage,
    effective: EffectiveOptions,
}

impl Resolved {
    /// The decoded RGBA source.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// The effective options the remaining stages will use.
    #[must_use]
    pub const fn effective(&self) -> &EffectiveOptions {
        &self.effective
    }

    /// Upscale the source and advance to the [`Upscaled`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidScale`] if `scale <= 0` and
    /// [`PipelineError::OutputTooLarge`] if the target raster is too
    /// large.
    pub fn upscale(self) -> Result<Upscaled, PipelineError> {
        let (upscaled, strategy) = upscale::upscale(
            &self.original,
            self.effective.scale,
            self.effective.anime_mode,
            self.effective.photo_filter,
        )?;
        Ok(Upscaled {
            options: self.options,
            original: self.original,
            effective: self.effective,
            upscaled,
            strategy,
        })
    }
}

// ───────────────────────── Stage 3: Upscaled ─────────────────────────

/// Pipeline state after upscaling.
#[must_use = "pipeline stages are consumed by advancing; call .enhance() to continue"]
pub struct Upscaled {
    options: EnhancementOptions,
    original: RgbaImage,
    effective: EffectiveOptions,
    upscaled: RgbaImage,
    strategy: UpscaleStrategy,
}

impl Upscaled {
    /// The decoded RGBA source.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// The upscaled raster, before enhancement.
    #[must_use]
    pub const fn upscaled(&self) -> &RgbaImage {
        &self.upscaled
    }

    /// Which upscaling strategy ran.
    #[must_use]
    pub const fn strategy(&self) -> UpscaleStrategy {
        self.strategy
    }

    /// Enhance the upscaled raster and advance to the [`Enhanced`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBuffer`] if the upscaled raster
    /// violates the raster invariant.
    pub fn enhance(self) -> Result<Enhanced, PipelineError> {
        let mut image = self.upscaled;
        let report = enhance::enhance_in_place(&mut image, &self.effective)?;
        Ok(Enhanced {
            original: self.original,
            effective: self.effective,
            enhanced: image,
            report,
        })
    }
}

// ───────────────────────── Stage 4: Enhanced ─────────────────────────

/// Pipeline state after tone and detail enhancement.
#[must_use = "pipeline stages are consumed by advancing; call .encode() to continue"]
pub struct Enhanced {
    original: RgbaImage,
    effective: EffectiveOptions,
    enhanced: RgbaImage,
    report: EnhanceReport,
}

impl Enhanced {
    /// The decoded RGBA source.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// The enhanced raster.
    #[must_use]
    pub const fn enhanced(&self) -> &RgbaImage {
        &self.enhanced
    }

    /// Mode and steps the enhancer ran.
    #[must_use]
    pub const fn report(&self) -> EnhanceReport {
        self.report
    }

    /// Encode as PNG and advance to the [`Encoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ImageEncode`] if encoding fails.
    pub fn encode(self) -> Result<Encoded, PipelineError> {
        self.encode_with(EncodeSettings::default())
    }

    /// Encode with explicit output settings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ImageEncode`] if encoding fails.
    pub fn encode_with(self, settings: EncodeSettings) -> Result<Encoded, PipelineError> {
        let bytes = codec::encode(&self.enhanced, settings.format, settings.quality_hint)?;
        Ok(Encoded {
            dimensions: Dimensions::of(&self.enhanced),
            original: self.original,
            effective: self.effective,
            enhanced: self.enhanced,
            bytes,
            format: settings.format,
        })
    }
}

// ───────────────────────── Stage 5: Encoded ──────────────────────────

/// Final pipeline state: the encoded output and every retained
/// intermediate.
pub struct Encoded {
    original: RgbaImage,
    effective: EffectiveOptions,
    enhanced: RgbaImage,
    bytes: Vec<u8>,
    format: OutputFormat,
    dimensions: Dimensions,
}

impl Encoded {
    /// The encoded output bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Output dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Consume the pipeline and return only the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            original: self.original,
            effective: self.effective,
            enhanced: self.enhanced,
            encoded: self.bytes,
            format: self.format,
            dimensions: self.dimensions,
        }
    }
}

// ──────────────────── PipelineStage trait + Stage enum ────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 6;

/// The output produced by a single pipeline stage.
#[must_use]
pub enum StageOutput<'a> {
    /// Source image bytes (not yet decoded).
    Source {
        /// The raw image bytes.
        bytes: &'a [u8],
    },
    /// Decoded RGBA image.
    Decoded {
        /// The original image.
        original: &'a RgbaImage,
    },
    /// Effective options.
    Resolved {
        /// Options after the quality dial.
        effective: &'a EffectiveOptions,
    },
    /// Upscaled raster.
    Upscaled {
        /// The upscaled image.
        upscaled: &'a RgbaImage,
    },
    /// Enhanced raster.
    Enhanced {
        /// The enhanced image.
        enhanced: &'a RgbaImage,
    },
    /// Encoded output.
    Encoded {
        /// The encoded bytes.
        bytes: &'a [u8],
        /// Output dimensions.
        dimensions: Dimensions,
    },
}

/// Trait implemented by every pipeline stage, enabling uniform iteration.
///
/// ```rust
/// # use crisp_pipeline::{EnhancementOptions, Pipeline, PipelineError};
/// # use crisp_pipeline::pipeline::{Advance, Stage};
/// # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
/// let mut stage: Stage = Pipeline::new(png, EnhancementOptions::default()).into();
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => { stage = done; break; }
///     }
/// }
/// let result = stage.complete()?;
/// # Ok(())
/// # }
/// ```
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage (e.g. `"source"`, `"upscale"`).
    const NAME: &str;

    /// Zero-based index of this stage (`0` for Pending through `5` for
    /// Encoded).
    const INDEX: usize;

    /// The output this stage produced.
    fn output(&self) -> StageOutput<'_>;

    /// Metrics describing the work done to reach this state.
    fn metrics(&self) -> StageMetrics;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(Some(stage))` on success, `Ok(None)` if already at
    /// the final stage, or `Err` if the stage transition fails.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the failing transition.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages to completion, encoding as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Source {
            bytes: &self.source,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Source {
            input_bytes: self.source.len(),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Decoded(self.decode()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.decode()?.complete()
    }
}

impl PipelineStage for Decoded {
    const NAME: &str = "decode";
    const INDEX: usize = 1;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Decoded {
            original: &self.original,
        }
    }

    fn metrics(&self) -> StageMetrics {
        let dims = Dimensions::of(&self.original);
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: dims.width,
            height: dims.height,
            pixel_count: dims.pixel_count(),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Resolved(self.resolve_quality())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.resolve_quality().complete()
    }
}

impl PipelineStage for Resolved {
    const NAME: &str = "quality";
    const INDEX: usize = 2;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Resolved {
            effective: &self.effective,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Quality {
            quality: quality::clamp_quality(self.options.quality),
            intensity: self.effective.intensity,
            brightness: self.effective.brightness,
            contrast: self.effective.contrast,
            saturation: self.effective.saturation,
            sharpness: self.effective.sharpness,
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Upscaled(self.upscale()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.upscale()?.complete()
    }
}

impl PipelineStage for Upscaled {
    const NAME: &str = "upscale";
    const INDEX: usize = 3;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Upscaled {
            upscaled: &self.upscaled,
        }
    }

    fn metrics(&self) -> StageMetrics {
        let dims = Dimensions::of(&self.upscaled);
        StageMetrics::Upscale {
            strategy: self.strategy.to_string(),
            scale: upscale::effective_scale(self.options.scale).unwrap_or(1.0),
            width: dims.width,
            height: dims.height,
            pixel_count: dims.pixel_count(),
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Enhanced(self.enhance()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.enhance()?.complete()
    }
}

impl PipelineStage for Enhanced {
    const NAME: &str = "enhance";
    const INDEX: usize = 4;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Enhanced {
            enhanced: &self.enhanced,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Enhance {
            mode: self.report.mode.to_string(),
            steps: self.report.applied,
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Encoded(self.encode()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.encode()?.complete()
    }
}

impl PipelineStage for Encoded {
    const NAME: &str = "encode";
    const INDEX: usize = 5;

    fn output(&self) -> StageOutput<'_> {
        StageOutput::Encoded {
            bytes: &self.bytes,
            dimensions: self.dimensions,
        }
    }

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Encode {
            format: self.format.to_string(),
            output_bytes: self.bytes.len(),
            width: self.dimensions.width,
            height: self.dimensions.height,
        }
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.into_result())
    }
}

/// A pipeline stage of any type.
#[must_use]
pub enum Stage {
    /// See [`Pending`].
    Pending(Pending),
    /// See [`Decoded`].
    Decoded(Decoded),
    /// See [`Resolved`].
    Resolved(Resolved),
    /// See [`Upscaled`].
    Upscaled(Upscaled),
    /// See [`Enhanced`].
    Enhanced(Enhanced),
    /// See [`Encoded`].
    Encoded(Encoded),
}

/// Compile-time guard: if a [`Stage`] variant is added, this match becomes
/// non-exhaustive and the build fails, a reminder to bump [`STAGE_COUNT`].
#[allow(dead_code, clippy::match_same_arms)]
const fn _stage_count_guard(s: &Stage) {
    match s {
        Stage::Pending(_)
        | Stage::Decoded(_)
        | Stage::Resolved(_)
        | Stage::Upscaled(_)
        | Stage::Enhanced(_)
        | Stage::Encoded(_) => {}
    }
}

/// Result of [`Stage::advance`]: either the next stage or the
/// completed final stage returned unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this next stage.
    Next(Stage),
    /// The pipeline was already at the final stage.
    Complete(Stage),
}

/// Delegate a method call to whichever `Stage` variant is active.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Pending(s) => s.$method($($arg),*),
            Self::Decoded(s) => s.$method($($arg),*),
            Self::Resolved(s) => s.$method($($arg),*),
            Self::Upscaled(s) => s.$method($($arg),*),
            Self::Enhanced(s) => s.$method($($arg),*),
            Self::Encoded(s) => s.$method($($arg),*),
        }
    };
}

impl Stage {
    /// Human-readable name of the current stage.
    #[must_use]
    pub fn name(&self) -> &'static str {
        delegate!(self, name)
    }

    /// Zero-based index of the current stage.
    #[must_use]
    pub fn index(&self) -> usize {
        delegate!(self, index)
    }

    /// The output this stage produced.
    pub fn output(&self) -> StageOutput<'_> {
        delegate!(self, output)
    }

    /// Metrics describing the work done to reach this state.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        delegate!(self, metrics)
    }

    /// Whether the pipeline is at the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }

    /// Advance to the next stage.
    ///
    /// Returns `Ok(None)` if already complete (the final value is
    /// consumed).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        delegate!(self, next)
    }

    /// Advance to the next stage, returning `self` unchanged if
    /// already complete.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a fallible stage transition fails.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        if self.is_complete() {
            return Ok(Advance::Complete(self));
        }
        // The is_complete() guard above ensures next() yields Some.
        #[allow(clippy::unreachable)]
        let next = self
            .next()?
            .unwrap_or_else(|| unreachable!("non-complete stage returned None from next()"));
        Ok(Advance::Next(next))
    }

    /// Run all remaining stages to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any remaining fallible stage fails.
    pub fn complete(self) -> Result<StagedResult, PipelineError> {
        delegate!(self, complete)
    }
}

// `PipelineStage`'s associated constants aren't callable via `self.NAME`,
// so the macro goes through this helper.
trait StageMetadata {
    fn name(&self) -> &'static str;
    fn index(&self) -> usize;
}

impl<T: PipelineStage> StageMetadata for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn index(&self) -> usize {
        T::INDEX
    }
}

impl From<Pending> for Stage {
    fn from(s: Pending) -> Self {
        Self::Pending(s)
    }
}

impl From<Decoded> for Stage {
    fn from(s: Decoded) -> Self {
        Self::Decoded(s)
    }
}

impl From<Resolved> for Stage {
    fn from(s: Resolved) -> Self {
        Self::Resolved(s)
    }
}

impl From<Upscaled> for Stage {
    fn from(s: Upscaled) -> Self {
        Self::Upscaled(s)
    }
}

impl From<Enhanced> for Stage {
    fn from(s: Enhanced) -> Self {
        Self::Enhanced(s)
    }
}

impl From<Encoded> for Stage {
    fn from(s: Encoded) -> Self {
        Self::Encoded(s)
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental enhancement pipeline.
///
/// Created via [`Pipeline::new`], which stores the source image and
/// options without doing any processing. Each stage method consumes the
/// current state and returns the next, making it a compile-time error to
/// skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and options.
    ///
    /// No processing is performed. Call [`.decode()`](Pending::decode)
    /// (or convert to a [`Stage`] and loop) to begin.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, options: EnhancementOptions) -> Pending {
        Pending {
            options,
            source: image_bytes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Create a PNG with a black/white vertical boundary.
    fn sharp_edge_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        codec::encode(&img, OutputFormat::Png, codec::DEFAULT_QUALITY_HINT).unwrap()
    }

    // ─────────── Typed API tests ─────────────────────────────────

    #[test]
    fn pending_exposes_source_bytes() {
        let png = sharp_edge_png(20, 20);
        let expected_len = png.len();
        let pending = Pipeline::new(png, EnhancementOptions::default());
        assert_eq!(pending.source().len(), expected_len);
        assert!((pending.options().scale - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn decode_empty_input_returns_error() {
        let result = Pipeline::new(vec![], EnhancementOptions::default()).decode();
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decode_corrupt_input_returns_error() {
        let result = Pipeline::new(vec![0xFF, 0x00], EnhancementOptions::default()).decode();
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn decoded_exposes_original() {
        let decoded = Pipeline::new(sharp_edge_png(20, 10), EnhancementOptions::default())
            .decode()
            .unwrap();
        assert_eq!(decoded.original().dimensions(), (20, 10));
    }

    #[test]
    fn resolved_exposes_effective_options() {
        let options = EnhancementOptions {
            brightness: 1.2,
            quality: 0.0,
            ..EnhancementOptions::default()
        };
        let resolved = Pipeline::new(sharp_edge_png(8, 8), options)
            .decode()
            .unwrap()
            .resolve_quality();
        assert!((resolved.effective().brightness - 1.02).abs() < 1e-6);
        assert_eq!(resolved.original().dimensions(), (8, 8));
    }

    #[test]
    fn upscaled_exposes_upscaled() {
        let options = EnhancementOptions {
            scale: 3.0,
            ..EnhancementOptions::default()
        };
        let upscaled = Pipeline::new(sharp_edge_png(10, 6), options)
            .decode()
            .unwrap()
            .resolve_quality()
            .upscale()
            .unwrap();
        assert_eq!(upscaled.upscaled().dimensions(), (30, 18));
        assert_eq!(upscaled.original().dimensions(), (10, 6));
        assert!(matches!(upscaled.strategy(), UpscaleStrategy::Photo(_)));
    }

    #[test]
    fn zero_scale_fails_at_upscale() {
        let options = EnhancementOptions {
            scale: 0.0,
            ..EnhancementOptions::default()
        };
        let result = Pipeline::new(sharp_edge_png(4, 4), options)
            .decode()
            .unwrap()
            .resolve_quality()
            .upscale();
        assert!(matches!(result, Err(PipelineError::InvalidScale(_))));
    }

    #[test]
    fn enhanced_keeps_dimensions_and_reports_mode() {
        let enhanced = Pipeline::new(sharp_edge_png(8, 8), EnhancementOptions::default())
            .decode()
            .unwrap()
            .resolve_quality()
            .upscale()
            .unwrap()
            .enhance()
            .unwrap();
        assert_eq!(enhanced.enhanced().dimensions(), (16, 16));
        assert_eq!(enhanced.report().mode, enhance::EnhanceMode::Conservative);
        assert!(enhanced.report().applied.denoise);
    }

    #[test]
    fn encoded_round_trips_through_decode() {
        let encoded = Pipeline::new(sharp_edge_png(8, 4), EnhancementOptions::default())
            .decode()
            .unwrap()
            .resolve_quality()
            .upscale()
            .unwrap()
            .enhance()
            .unwrap()
            .encode()
            .unwrap();
        assert_eq!(encoded.dimensions(), Dimensions::new(16, 8));
        let decoded = codec::decode(encoded.bytes()).unwrap();
        assert_eq!(decoded.dimensions(), (16, 8));

        let result = encoded.into_result();
        assert_eq!(result.format, OutputFormat::Png);
        assert_eq!(result.enhanced.as_raw(), decoded.as_raw());
        assert_eq!(result.original.dimensions(), (8, 4));
    }

    #[test]
    fn encode_with_jpeg_settings() {
        let settings = EncodeSettings {
            format: OutputFormat::Jpeg,
            quality_hint: 80,
        };
        let result = Pipeline::new(sharp_edge_png(8, 8), EnhancementOptions::default())
            .decode()
            .unwrap()
            .resolve_quality()
            .upscale()
            .unwrap()
            .enhance()
            .unwrap()
            .encode_with(settings)
            .unwrap()
            .into_result();
        assert_eq!(result.format, OutputFormat::Jpeg);
        assert_eq!(&result.encoded[..2], &[0xFF, 0xD8]);
    }

    // ─────────── Dynamic API tests ───────────────────────────────

    #[test]
    fn stage_loop_visits_every_stage_in_order() {
        let mut stage: Stage =
            Pipeline::new(sharp_edge_png(6, 6), EnhancementOptions::default()).into();
        let mut names = vec![stage.name()];
        loop {
            match stage.advance().unwrap() {
                Advance::Next(next) => {
                    assert_eq!(next.index(), names.len());
                    names.push(next.name());
                    stage = next;
                }
                Advance::Complete(done) => {
                    stage = done;
                    break;
                }
            }
        }
        assert_eq!(names.len(), STAGE_COUNT);
        assert_eq!(
            names,
            ["source", "decode", "quality", "upscale", "enhance", "encode"]
        );
        assert!(stage.is_complete());
        let result = stage.complete().unwrap();
        assert_eq!(result.dimensions, Dimensions::new(12, 12));
    }

    #[test]
    fn complete_from_any_stage_matches() {
        let png = sharp_edge_png(6, 4);
        let options = EnhancementOptions::default();
        let from_start = Stage::from(Pipeline::new(png.clone(), options))
            .complete()
            .unwrap();
        let from_resolved = Stage::from(
            Pipeline::new(png, options)
                .decode()
                .unwrap()
                .resolve_quality(),
        )
        .complete()
        .unwrap();
        assert_eq!(from_start.encoded, from_resolved.encoded);
    }

    #[test]
    fn final_stage_next_is_none() {
        let encoded = Pipeline::new(sharp_edge_png(4, 4), EnhancementOptions::neutral())
            .decode()
            .unwrap()
            .resolve_quality()
            .upscale()
            .unwrap()
            .enhance()
            .unwrap()
            .encode()
            .unwrap();
        assert!(Stage::from(encoded).next().unwrap().is_none());
    }

    #[test]
    fn stage_outputs_match_variants() {
        let pending = Pipeline::new(sharp_edge_png(4, 4), EnhancementOptions::default());
        assert!(matches!(
            Stage::from(pending).output(),
            StageOutput::Source { bytes } if !bytes.is_empty()
        ));
    }

    #[test]
    fn stage_metrics_describe_work() {
        let decoded = Pipeline::new(sharp_edge_png(5, 3), EnhancementOptions::default())
            .decode()
            .unwrap();
        assert!(matches!(
            decoded.metrics(),
            StageMetrics::Decode {
                width: 5,
                height: 3,
                pixel_count: 15,
                ..
            }
        ));
    }
}
