//! Pipeline diagnostics: timing and per-stage metrics.
//!
//! Every call to [`enhance_with_diagnostics`] collects a
//! [`PipelineDiagnostics`] alongside the pipeline result. The CLI prints
//! it as a report; the worker ships it to the UI as JSON.
//!
//! Time is read through the [`Clock`] trait so the crate stays sans-IO.
//! [`WebClock`] uses the `web-time` crate, which maps to
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::EncodeSettings;
use crate::enhance::AppliedSteps;
use crate::pipeline::{Pipeline, PipelineStage, StagedResult};
use crate::types::{EnhancementOptions, PipelineError};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of monotonic time for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by `web_time::Instant`: works in browsers and on
/// native targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: quality dial resolution.
    pub quality: StageDiagnostics,
    /// Stage 3: upscaling.
    pub upscale: StageDiagnostics,
    /// Stage 4: tone and detail enhancement.
    pub enhance: StageDiagnostics,
    /// Stage 5: output encoding.
    pub encode: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Input and output sizes.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Undecoded source bytes.
    Source {
        /// Size of the input image bytes.
        input_bytes: usize,
    },
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Quality dial metrics.
    Quality {
        /// Requested quality dial position (after clamping).
        quality: f32,
        /// Intensity the factor deviations were scaled by.
        intensity: f32,
        /// Effective brightness factor.
        brightness: f32,
        /// Effective contrast factor.
        contrast: f32,
        /// Effective saturation factor.
        saturation: f32,
        /// Effective sharpness factor.
        sharpness: f32,
    },
    /// Upscaling metrics.
    Upscale {
        /// Strategy that ran (`Copy`, `Photo(..)`, `Anime`).
        strategy: String,
        /// Scale factor actually applied, after clamping.
        scale: f32,
        /// Output width in pixels.
        width: u32,
        /// Output height in pixels.
        height: u32,
        /// Output pixel count.
        pixel_count: u64,
    },
    /// Enhancement metrics.
    Enhance {
        /// Mode the enhancer ran in.
        mode: String,
        /// Steps that ran.
        steps: AppliedSteps,
    },
    /// Encoding metrics.
    Encode {
        /// Output format name.
        format: String,
        /// Size of the encoded output.
        output_bytes: usize,
        /// Encoded image width in pixels.
        width: u32,
        /// Encoded image height in pixels.
        height: u32,
    },
}

/// High-level summary of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub source_width: u32,
    /// Source image height in pixels.
    pub source_height: u32,
    /// Output image width in pixels.
    pub output_width: u32,
    /// Output image height in pixels.
    pub output_height: u32,
    /// Size of the input bytes.
    pub input_bytes: usize,
    /// Size of the encoded output.
    pub output_bytes: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Enhancement Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} -> {}x{}",
            self.summary.source_width,
            self.summary.source_height,
            self.summary.output_width,
            self.summary.output_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<12} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Bytes: {} in  |  {} out",
            self.summary.input_bytes, self.summary.output_bytes,
        ));

        lines.join("\n")
    }

    /// Every stage with its display name, in execution order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Decode", &self.decode),
            ("Quality", &self.quality),
            ("Upscale", &self.upscale),
            ("Enhance", &self.enhance),
            ("Encode", &self.encode),
        ]
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Source { input_bytes } => format!("{input_bytes} bytes"),
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Quality {
            quality,
            intensity,
            brightness,
            contrast,
            saturation,
            sharpness,
        } => format!(
            "q={quality:.0} i={intensity:.3} b={brightness:.3} c={contrast:.3} s={saturation:.3} sh={sharpness:.3}",
        ),
        StageMetrics::Upscale {
            strategy,
            scale,
            width,
            height,
            ..
        } => format!("{strategy} x{scale:.2} -> {width}x{height}"),
        StageMetrics::Enhance { mode, steps } => {
            let names: Vec<&str> = [
                (steps.brightness, "brightness"),
                (steps.contrast, "contrast"),
                (steps.saturation, "saturation"),
                (steps.sharpen, "sharpen"),
                (steps.denoise, "denoise"),
            ]
            .into_iter()
            .filter_map(|(ran, name)| ran.then_some(name))
            .collect();
            if names.is_empty() {
                format!("{mode}: no-op")
            } else {
                format!("{mode}: {}", names.join(", "))
            }
        }
        StageMetrics::Encode {
            format,
            output_bytes,
            width,
            height,
        } => format!("{format} {width}x{height} -> {output_bytes} bytes"),
    }
}

/// Time one stage transition and capture the metrics of the stage it
/// produced.
fn timed<C, S, F>(clock: &C, advance: F) -> Result<(S, StageDiagnostics), PipelineError>
where
    C: Clock,
    S: PipelineStage,
    F: FnOnce() -> Result<S, PipelineError>,
{
    let start = clock.now();
    let stage = advance()?;
    let duration = clock.elapsed(&start);
    let metrics = stage.metrics();
    log::trace!("stage {} took {duration:?}", S::NAME);
    Ok((
        stage,
        StageDiagnostics {
            duration,
            metrics,
        },
    ))
}

/// Run the full pipeline, timing every stage.
///
/// # Errors
///
/// Returns the first [`PipelineError`] any stage produces.
pub fn enhance_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    options: &EnhancementOptions,
    settings: EncodeSettings,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let pending = Pipeline::new(image_bytes.to_vec(), *options);
    let (decoded, decode) = timed(clock, || pending.decode())?;
    let (resolved, quality) = timed(clock, || Ok(decoded.resolve_quality()))?;
    let (upscaled, upscale) = timed(clock, || resolved.upscale())?;
    let (enhanced, enhance) = timed(clock, || upscaled.enhance())?;
    let (encoded, encode) = timed(clock, || enhanced.encode_with(settings))?;

    let total_duration = clock.elapsed(&start);
    let result = encoded.into_result();

    let summary = PipelineSummary {
        source_width: result.original.width(),
        source_height: result.original.height(),
        output_width: result.dimensions.width,
        output_height: result.dimensions.height,
        input_bytes: image_bytes.len(),
        output_bytes: result.encoded.len(),
    };
    log::debug!(
        "pipeline finished in {total_duration:?}: {}x{} -> {}x{}",
        summary.source_width,
        summary.source_height,
        summary.output_width,
        summary.output_height,
    );

    Ok((
        result,
        PipelineDiagnostics {
            decode,
            quality,
            upscale,
            enhance,
            encode,
            total_duration,
            summary,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::codec::OutputFormat;

    /// Clock that advances one millisecond per reading.
    struct StepClock(Cell<u64>);

    impl Clock for StepClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn gradient_png(w: u32, h: u32) -> Vec<u8> {
        #[allow(clippy::cast_possible_truncation)]
        let img = crate::RgbaImage::from_fn(w, h, |x, y| {
            image::Rgba([(x * 20) as u8, (y * 20) as u8, 100, 255])
        });
        crate::codec::encode(&img, OutputFormat::Png, crate::codec::DEFAULT_QUALITY_HINT).unwrap()
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn collects_metrics_for_every_stage() {
        let png = gradient_png(6, 4);
        let options = EnhancementOptions {
            scale: 2.0,
            ..EnhancementOptions::default()
        };
        let clock = StepClock(Cell::new(0));
        let (result, diag) =
            enhance_with_diagnostics(&png, &options, EncodeSettings::default(), &clock).unwrap();

        assert!(matches!(
            diag.decode.metrics,
            StageMetrics::Decode {
                width: 6,
                height: 4,
                pixel_count: 24,
                ..
            }
        ));
        assert!(matches!(diag.quality.metrics, StageMetrics::Quality { .. }));
        assert!(matches!(
            diag.upscale.metrics,
            StageMetrics::Upscale {
                width: 12,
                height: 8,
                ..
            }
        ));
        assert!(matches!(diag.enhance.metrics, StageMetrics::Enhance { .. }));
        let StageMetrics::Encode { output_bytes, .. } = diag.encode.metrics else {
            unreachable!("encode stage must report encode metrics");
        };
        assert_eq!(output_bytes, result.encoded.len());
        assert_eq!(diag.summary.output_bytes, result.encoded.len());
        assert_eq!((diag.summary.output_width, diag.summary.output_height), (12, 8));
    }

    #[test]
    fn durations_come_from_the_clock() {
        let png = gradient_png(4, 4);
        let clock = StepClock(Cell::new(0));
        let (_, diag) = enhance_with_diagnostics(
            &png,
            &EnhancementOptions::default(),
            EncodeSettings::default(),
            &clock,
        )
        .unwrap();
        for (name, stage) in diag.stages() {
            assert_eq!(stage.duration, Duration::from_millis(1), "{name}");
        }
        assert!(diag.total_duration > Duration::from_millis(5));
    }

    #[test]
    fn errors_propagate() {
        let clock = WebClock;
        let result = enhance_with_diagnostics(
            &[],
            &EnhancementOptions::default(),
            EncodeSettings::default(),
            &clock,
        );
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn report_lists_every_stage() {
        let png = gradient_png(5, 5);
        let (_, diag) = enhance_with_diagnostics(
            &png,
            &EnhancementOptions::default(),
            EncodeSettings::default(),
            &WebClock,
        )
        .unwrap();
        let report = diag.report();
        assert!(report.contains("Enhancement Diagnostics Report"));
        for name in ["Decode", "Quality", "Upscale", "Enhance", "Encode"] {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("5x5 -> 10x10"));
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let png = gradient_png(3, 3);
        let clock = StepClock(Cell::new(0));
        let (_, diag) = enhance_with_diagnostics(
            &png,
            &EnhancementOptions::neutral(),
            EncodeSettings::default(),
            &clock,
        )
        .unwrap();
        let json = serde_json::to_value(&diag).unwrap();
        let secs = json["decode"]["duration"].as_f64().unwrap();
        assert!((secs - 0.001).abs() < 1e-9);
        assert!(json["totalDuration"].is_f64());

        let back: PipelineDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.decode.duration, diag.decode.duration);
        assert_eq!(back.upscale.metrics, diag.upscale.metrics);
    }

    #[test]
    fn enhance_metrics_name_steps() {
        let metrics = StageMetrics::Enhance {
            mode: "Conservative".to_string(),
            steps: AppliedSteps {
                sharpen: true,
                denoise: true,
                ..AppliedSteps::default()
            },
        };
        assert_eq!(format_metrics(&metrics), "Conservative: sharpen, denoise");

        let idle = StageMetrics::Enhance {
            mode: "Standard".to_string(),
            steps: AppliedSteps::default(),
        };
        assert_eq!(format_metrics(&idle), "Standard: no-op");
    }
}
