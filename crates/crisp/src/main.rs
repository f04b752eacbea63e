//! crisp: upscale and enhance an image file from the command line.
//!
//! Runs the enhancement pipeline on one image, writes the result, and
//! prints per-stage diagnostics. Useful for:
//!
//! - Batch-enhancing files outside the browser
//! - Comparing presets and photo filters on the same source
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin crisp -- [OPTIONS] <INPUT> -o <OUTPUT>
//! ```
//!
//! Progress goes to the log (`RUST_LOG`, default `info`); the report goes
//! to stdout.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use crisp_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use crisp_pipeline::{EncodeSettings, EnhancementOptions, OutputFormat, PhotoFilter};

/// Upscale and enhance an image.
///
/// Options start from the chosen preset (or the defaults) and individual
/// flags override single values.
#[derive(Parser)]
#[command(name = "crisp", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Where to write the enhanced image.
    #[arg(short, long)]
    output: PathBuf,

    /// Start from a named preset.
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// Brightness factor (1.0 = unchanged).
    #[arg(long)]
    brightness: Option<f32>,

    /// Contrast factor (1.0 = unchanged).
    #[arg(long)]
    contrast: Option<f32>,

    /// Saturation factor (1.0 = unchanged). Ignored unless
    /// --no-preserve-colors is set.
    #[arg(long)]
    saturation: Option<f32>,

    /// Sharpness factor; values at or below 1.0 disable sharpening.
    #[arg(long)]
    sharpness: Option<f32>,

    /// Upscale factor, clamped to 1-4; zero or negative is an error.
    #[arg(long)]
    scale: Option<f32>,

    /// Enhancement intensity, 0 to 100.
    #[arg(long)]
    quality: Option<f32>,

    /// Skip the denoise pass.
    #[arg(long)]
    no_denoise: bool,

    /// Use standard mode: wider bands and saturation.
    #[arg(long)]
    no_preserve_colors: bool,

    /// Nearest-neighbor upscaling with edge-preserving smoothing.
    #[arg(long)]
    anime: bool,

    /// Resampling filter for photo-mode upscaling.
    #[arg(long, value_enum)]
    photo_filter: Option<Filter>,

    /// Output container.
    #[arg(long, value_enum, default_value_t = Format::Png)]
    format: Format,

    /// JPEG quality (1-100). Ignored for PNG.
    #[arg(long, default_value_t = crisp_pipeline::codec::DEFAULT_QUALITY_HINT, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Full enhancement options as a JSON string (camelCase fields).
    ///
    /// When provided, --preset and all individual option flags are
    /// ignored. Missing fields take their defaults.
    #[arg(long)]
    options_json: Option<String>,

    /// Also write a JPEG preview of the input to this path.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Bounding-box edge of the preview, in pixels.
    #[arg(long, default_value_t = crisp_pipeline::codec::DEFAULT_PREVIEW_EDGE, value_parser = clap::value_parser!(u32).range(1..))]
    preview_edge: u32,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,
}

/// Preset selection.
#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    /// Balanced settings for photographs.
    Photo,
    /// Flat-color art: anime-mode upscaling, no denoise.
    Artwork,
    /// Scanned text: strong contrast and sharpening.
    Document,
    /// 4x upscale with gentle tone changes.
    Ultra,
}

impl From<PresetArg> for crisp_pipeline::Preset {
    fn from(p: PresetArg) -> Self {
        match p {
            PresetArg::Photo => Self::Photo,
            PresetArg::Artwork => Self::Artwork,
            PresetArg::Document => Self::Document,
            PresetArg::Ultra => Self::Ultra,
        }
    }
}

/// Photo-mode resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Bilinear interpolation (fast, soft).
    Triangle,
    /// Bicubic Catmull-Rom (good quality).
    CatmullRom,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

impl From<Filter> for PhotoFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Output container selection.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum Format {
    /// Lossless PNG.
    Png,
    /// Lossy JPEG (alpha discarded).
    Jpeg,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Png => Self::Png,
            Format::Jpeg => Self::Jpeg,
        }
    }
}

/// Build [`EnhancementOptions`] from CLI arguments.
///
/// If `--options-json` is provided, the JSON is parsed directly and all
/// individual flags are ignored. Otherwise the preset (or defaults) is
/// taken as the base and each given flag overrides one field.
fn options_from_cli(cli: &Cli) -> Result<EnhancementOptions, String> {
    if let Some(ref json) = cli.options_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --options-json: {e}"));
    }

    let mut options = cli
        .preset
        .map_or_else(EnhancementOptions::default, |p| {
            crisp_pipeline::Preset::from(p).options()
        });

    let overrides = [
        (cli.brightness, &mut options.brightness),
        (cli.contrast, &mut options.contrast),
        (cli.saturation, &mut options.saturation),
        (cli.sharpness, &mut options.sharpness),
        (cli.scale, &mut options.scale),
        (cli.quality, &mut options.quality),
    ];
    for (value, field) in overrides {
        if let Some(v) = value {
            *field = v;
        }
    }

    if cli.no_denoise {
        options.denoise = false;
    }
    if cli.no_preserve_colors {
        options.preserve_colors = false;
    }
    if cli.anime {
        options.anime_mode = true;
    }
    if let Some(filter) = cli.photo_filter {
        options.photo_filter = filter.into();
    }
    Ok(options)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let options = match options_from_cli(&cli) {
        Ok(o) => o,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let settings = EncodeSettings {
        format: cli.format.into(),
        quality_hint: cli.jpeg_quality,
    };

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "image: {} ({} bytes)",
        cli.input.display(),
        image_bytes.len(),
    );
    log::info!("options: {options:?}");
    log::info!("runs: {}", cli.runs);

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            log::info!("run {}/{}", run + 1, cli.runs);
        }

        match crisp_pipeline::diagnostics::enhance_with_diagnostics(
            &image_bytes,
            &options,
            settings,
            &StdClock,
        ) {
            Ok((staged, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write the output on the first run only.
                if run == 0 {
                    if let Err(e) = std::fs::write(&cli.output, &staged.encoded) {
                        eprintln!("Error writing {}: {e}", cli.output.display());
                        return ExitCode::FAILURE;
                    }
                    log::info!(
                        "{} written to {} ({} bytes, {}x{})",
                        staged.format.mime_type(),
                        cli.output.display(),
                        staged.encoded.len(),
                        staged.dimensions.width,
                        staged.dimensions.height,
                    );

                    if let Some(ref path) = cli.preview {
                        let written = crisp_pipeline::codec::preview_raster(
                            &staged.original,
                            cli.preview_edge,
                        )
                        .map_err(|e| e.to_string())
                        .and_then(|jpeg| std::fs::write(path, jpeg).map_err(|e| e.to_string()));
                        if let Err(e) = written {
                            eprintln!("Error writing preview {}: {e}", path.display());
                            return ExitCode::FAILURE;
                        }
                        log::info!("preview written to {}", path.display());
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<12} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(28));

    let runs = all_diagnostics.len() as f64;
    let mut sums = [0.0_f64; 5];
    for diagnostics in all_diagnostics {
        for (sum, (_, stage)) in sums.iter_mut().zip(diagnostics.stages()) {
            *sum += stage.duration.as_secs_f64() * 1000.0;
        }
    }
    for (sum, (name, _)) in sums.iter().zip(all_diagnostics[0].stages()) {
        println!("{name:<12} {:>10.3}ms", sum / runs);
    }
}
