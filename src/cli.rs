use clap::Parser;
use std::path::PathBuf;

use wavecast::config::{Quality, Style, VisualizationOptions};

#[derive(Parser, Debug)]
#[command(name = "wavecast", about = "Render an audio-reactive dot or bar visualizer video")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: PathBuf,

    /// Output video file [default: <input>_<style>.mp4]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file [default: ./wavecast.toml or the user config dir]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Visualization style
    #[arg(short, long, value_enum)]
    pub style: Option<Style>,

    /// Output quality (sets fps, resolution, smoothing and bitrate)
    #[arg(short, long, value_enum)]
    pub quality: Option<Quality>,

    /// Color as #RRGGBB [default: #00FFFF for dots, #00FF00 for bars]
    #[arg(short, long)]
    pub color: Option<String>,

    /// Worker threads for amplitude extraction [default: cores - 1]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Maximum seconds of audio to render [default: 600]
    #[arg(short = 'd', long)]
    pub max_duration: Option<f64>,

    /// Dot diameter in pixels (dots style)
    #[arg(long)]
    pub dot_size: Option<u32>,

    /// Gap between dots in pixels (dots style)
    #[arg(long)]
    pub dot_spacing: Option<u32>,

    /// Maximum visualization height as a percentage of frame height (dots style)
    #[arg(long)]
    pub max_height: Option<u32>,

    /// Number of bars (bars style)
    #[arg(long)]
    pub bar_count: Option<usize>,

    /// Override the preset frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Override the preset video bitrate, in kbit/s
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// Override the preset smoothing window (odd number of frames)
    #[arg(long)]
    pub smoothing: Option<usize>,

    /// Seed for the dot opacity dither, for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write this timeline frame as a PNG next to the output instead of encoding a video
    #[arg(long)]
    pub preview_frame: Option<usize>,
}

impl Cli {
    pub fn options(&self) -> VisualizationOptions {
        VisualizationOptions {
            style: self.style,
            quality: self.quality,
            color: self.color.clone(),
            max_duration_seconds: self.max_duration,
            dot_size: self.dot_size,
            dot_spacing: self.dot_spacing,
            max_height_percent: self.max_height,
            bar_count: self.bar_count,
            worker_count: self.workers,
            fps: self.fps,
            bitrate_kbps: self.bitrate,
            smoothing_window: self.smoothing,
            seed: self.seed,
        }
    }
}
