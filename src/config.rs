use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{RenderError, RenderResult};

pub const DEFAULT_MAX_DURATION_SECONDS: f64 = 600.0;
pub const DEFAULT_DOT_SIZE: u32 = 6;
pub const DEFAULT_DOT_SPACING: u32 = 6;
pub const DEFAULT_MAX_HEIGHT_PERCENT: u32 = 30;
pub const DEFAULT_BAR_COUNT: usize = 46;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Dots,
    Bars,
}

impl Style {
    pub fn name(self) -> &'static str {
        match self {
            Style::Dots => "dots",
            Style::Bars => "bars",
        }
    }

    fn default_color(self) -> Rgb {
        match self {
            Style::Dots => Rgb([0x00, 0xFF, 0xFF]),
            Style::Bars => Rgb([0x00, 0xFF, 0x00]),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

/// Output format implied by a quality level for a given style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QualityPreset {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub smoothing_window: usize,
    pub bitrate_kbps: u32,
}

impl QualityPreset {
    pub fn for_style(style: Style, quality: Quality) -> Self {
        let (width, height, smoothing_window) = match quality {
            Quality::Low => (854, 480, 3),
            Quality::Medium => (1280, 720, 5),
            Quality::High => (1920, 1080, 5),
        };
        // Bars animate faster and carry more edge detail than the dot matrix.
        let (fps, bitrate_kbps) = match (style, quality) {
            (Style::Dots, Quality::Low) => (10, 2000),
            (Style::Dots, Quality::Medium) => (20, 4000),
            (Style::Dots, Quality::High) => (30, 8000),
            (Style::Bars, Quality::Low) => (24, 4000),
            (Style::Bars, Quality::Medium) => (30, 6000),
            (Style::Bars, Quality::High) => (60, 10000),
        };
        Self {
            fps,
            width,
            height,
            smoothing_window,
            bitrate_kbps,
        }
    }
}

/// An opaque colour parsed from `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl FromStr for Rgb {
    type Err = RenderError;

    fn from_str(s: &str) -> RenderResult<Self> {
        let invalid = || RenderError::config(format!("invalid color {s:?}: expected #RRGGBB"));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

/// Unvalidated render options as supplied by a caller, a CLI or a config file.
///
/// Every field is optional; `None` means "use the default for the chosen style and quality".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisualizationOptions {
    pub style: Option<Style>,
    pub quality: Option<Quality>,
    pub color: Option<String>,
    pub max_duration_seconds: Option<f64>,
    pub dot_size: Option<u32>,
    pub dot_spacing: Option<u32>,
    pub max_height_percent: Option<u32>,
    pub bar_count: Option<usize>,
    pub worker_count: Option<usize>,
    pub fps: Option<u32>,
    pub bitrate_kbps: Option<u32>,
    pub smoothing_window: Option<usize>,
    pub seed: Option<u64>,
}

impl VisualizationOptions {
    /// Fills every unset field from `fallback`.
    pub fn or(self, fallback: VisualizationOptions) -> Self {
        Self {
            style: self.style.or(fallback.style),
            quality: self.quality.or(fallback.quality),
            color: self.color.or(fallback.color),
            max_duration_seconds: self.max_duration_seconds.or(fallback.max_duration_seconds),
            dot_size: self.dot_size.or(fallback.dot_size),
            dot_spacing: self.dot_spacing.or(fallback.dot_spacing),
            max_height_percent: self.max_height_percent.or(fallback.max_height_percent),
            bar_count: self.bar_count.or(fallback.bar_count),
            worker_count: self.worker_count.or(fallback.worker_count),
            fps: self.fps.or(fallback.fps),
            bitrate_kbps: self.bitrate_kbps.or(fallback.bitrate_kbps),
            smoothing_window: self.smoothing_window.or(fallback.smoothing_window),
            seed: self.seed.or(fallback.seed),
        }
    }
}

/// Validated, immutable settings for one render.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualizationConfig {
    pub style: Style,
    pub quality: Quality,
    pub color: Rgb,
    pub max_duration_seconds: f64,
    pub dot_size: u32,
    pub dot_spacing: u32,
    pub max_height_percent: u32,
    pub bar_count: usize,
    pub worker_count: usize,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub smoothing_window: usize,
    pub seed: Option<u64>,
}

impl VisualizationConfig {
    pub fn from_options(opts: &VisualizationOptions) -> RenderResult<Self> {
        let style = opts.style.unwrap_or_default();
        let quality = opts.quality.unwrap_or_default();
        let preset = QualityPreset::for_style(style, quality);

        let color = match opts.color.as_deref() {
            Some(s) => s.parse::<Rgb>()?,
            None => style.default_color(),
        };

        let max_duration_seconds = opts
            .max_duration_seconds
            .unwrap_or(DEFAULT_MAX_DURATION_SECONDS);
        if !max_duration_seconds.is_finite() || max_duration_seconds <= 0.0 {
            return Err(RenderError::config(format!(
                "max duration must be a positive number of seconds, got {max_duration_seconds}"
            )));
        }

        let dot_size = opts.dot_size.unwrap_or(DEFAULT_DOT_SIZE);
        let dot_spacing = opts.dot_spacing.unwrap_or(DEFAULT_DOT_SPACING);
        if dot_size == 0 || dot_spacing == 0 {
            return Err(RenderError::config("dot size and dot spacing must be positive"));
        }

        let max_height_percent = opts.max_height_percent.unwrap_or(DEFAULT_MAX_HEIGHT_PERCENT);
        if max_height_percent == 0 || max_height_percent > 100 {
            return Err(RenderError::config(format!(
                "max height must be within 1..=100 percent, got {max_height_percent}"
            )));
        }

        let bar_count = opts.bar_count.unwrap_or(DEFAULT_BAR_COUNT);
        if bar_count == 0 {
            return Err(RenderError::config("bar count must be at least 1"));
        }

        let worker_count = match opts.worker_count {
            Some(0) => return Err(RenderError::config("worker count must be at least 1")),
            Some(n) => n,
            None => default_worker_count(),
        };

        let fps = opts.fps.unwrap_or(preset.fps);
        if fps == 0 {
            return Err(RenderError::config("fps must be at least 1"));
        }

        let bitrate_kbps = opts.bitrate_kbps.unwrap_or(preset.bitrate_kbps);
        if bitrate_kbps == 0 {
            return Err(RenderError::config("bitrate must be positive"));
        }

        let smoothing_window = opts.smoothing_window.unwrap_or(preset.smoothing_window);
        if smoothing_window == 0 || smoothing_window % 2 == 0 {
            return Err(RenderError::config(format!(
                "smoothing window must be odd and at least 1, got {smoothing_window}"
            )));
        }

        let config = Self {
            style,
            quality,
            color,
            max_duration_seconds,
            dot_size,
            dot_spacing,
            max_height_percent,
            bar_count,
            worker_count,
            fps,
            width: preset.width,
            height: preset.height,
            bitrate_kbps,
            smoothing_window,
            seed: opts.seed,
        };

        if config.bucket_count() == 0 {
            return Err(RenderError::config(format!(
                "dot size {dot_size} plus spacing {dot_spacing} leaves no room for a dot column at width {}",
                config.width
            )));
        }

        Ok(config)
    }

    /// Number of spatial buckets (dot columns or bars) drawn per frame.
    pub fn bucket_count(&self) -> usize {
        match self.style {
            Style::Dots => (self.width / self.dot_size.saturating_add(self.dot_spacing)) as usize,
            Style::Bars => self.bar_count,
        }
    }

    /// `min(audio_duration, max_duration_seconds)`.
    pub fn effective_duration(&self, audio_duration: f64) -> f64 {
        audio_duration.min(self.max_duration_seconds)
    }
}

/// Logical cores minus one, never less than one.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// `<input_dir>/<input_stem>_<style>.mp4`
pub fn derive_output_path(input: &Path, style: Style) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_{}.mp4", style.name()))
}

/// On-disk configuration (`wavecast.toml`).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub visual: VisualSection,
    #[serde(default)]
    pub audio: AudioSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    pub style: Option<Style>,
    pub quality: Option<Quality>,
    pub fps: Option<u32>,
    pub bitrate_kbps: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisualSection {
    pub color: Option<String>,
    pub dot_size: Option<u32>,
    pub dot_spacing: Option<u32>,
    pub max_height_percent: Option<u32>,
    pub bar_count: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AudioSection {
    pub max_duration: Option<f64>,
    pub smoothing_window: Option<usize>,
    pub workers: Option<usize>,
}

impl FileConfig {
    pub fn into_options(self) -> VisualizationOptions {
        VisualizationOptions {
            style: self.output.style,
            quality: self.output.quality,
            color: self.visual.color,
            max_duration_seconds: self.audio.max_duration,
            dot_size: self.visual.dot_size,
            dot_spacing: self.visual.dot_spacing,
            max_height_percent: self.visual.max_height_percent,
            bar_count: self.visual.bar_count,
            worker_count: self.audio.workers,
            fps: self.output.fps,
            bitrate_kbps: self.output.bitrate_kbps,
            smoothing_window: self.audio.smoothing_window,
            seed: self.visual.seed,
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Layers a config file underneath `options`, which keep precedence.
///
/// A file passed explicitly must load, otherwise the run stops with a config error. A file
/// found by [`find_config_file`] that fails to load is skipped with a warning.
pub fn merge_config_file(
    options: VisualizationOptions,
    explicit: Option<&Path>,
) -> RenderResult<VisualizationOptions> {
    if let Some(path) = explicit {
        let file = load_config(path).map_err(|err| RenderError::config(format!("{err:#}")))?;
        log::info!("Loaded config from {}", path.display());
        return Ok(options.or(file.into_options()));
    }

    let Some(path) = find_config_file() else {
        return Ok(options);
    };
    match load_config(&path) {
        Ok(file) => {
            log::info!("Loaded config from {}", path.display());
            Ok(options.or(file.into_options()))
        }
        Err(err) => {
            log::warn!("Ignoring config: {:#}", err);
            Ok(options)
        }
    }
}

/// `./wavecast.toml`, then the per-user config locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("wavecast.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("wavecast").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("wavecast").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
