use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

use crate::audio::decode::{decode_audio_limited, AudioBuffer};
use crate::audio::extract::{total_frames, AmplitudeExtractor};
use crate::audio::timeline::AmplitudeTimeline;
use crate::cancel::CancelToken;
use crate::config::{derive_output_path, VisualizationConfig, VisualizationOptions};
use crate::encode::ffmpeg::{EncodeSettings, FfmpegEncoder};
use crate::error::{RenderError, RenderResult};
use crate::render::frame::{FrameClock, FrameRenderer};

/// Frame-level facts of one render, fixed once the audio is known.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPlan {
    pub duration_seconds: f64,
    pub total_frames: usize,
    pub bucket_count: usize,
    pub fps: u32,
}

impl RenderPlan {
    pub fn resolve(config: &VisualizationConfig, audio_duration: f64) -> Self {
        let duration_seconds = config.effective_duration(audio_duration);
        Self {
            duration_seconds,
            total_frames: total_frames(config.fps, duration_seconds),
            bucket_count: config.bucket_count(),
            fps: config.fps,
        }
    }
}

/// Normalized amplitudes ready for drawing.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub plan: RenderPlan,
    pub timeline: AmplitudeTimeline,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderOutcome {
    pub output: PathBuf,
    pub frames_written: usize,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration_seconds: f64,
}

/// Runs the decode → extract → smooth → normalize → draw → encode pipeline for one config.
pub struct Renderer {
    config: VisualizationConfig,
    cancel: CancelToken,
    progress: ProgressBar,
}

impl Renderer {
    pub fn new(config: VisualizationConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Bar advanced once per encoded frame. Its length is set when rendering starts.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn decode(&self, input: &Path) -> RenderResult<AudioBuffer> {
        log::info!("Decoding audio...");
        decode_audio_limited(input, Some(self.config.max_duration_seconds))
            .map_err(RenderError::decode)
    }

    /// Extraction (parallel), then smoothing and global normalization.
    pub fn analyze(&self, audio: &AudioBuffer) -> RenderResult<Analysis> {
        let plan = RenderPlan::resolve(&self.config, audio.duration_seconds());
        if plan.total_frames == 0 {
            return Err(RenderError::Decode(format!(
                "audio is too short to render: {:.3}s yields no frames at {}fps",
                plan.duration_seconds, plan.fps
            )));
        }
        if plan.duration_seconds < audio.duration_seconds() {
            log::info!(
                "Capping visualization to {:.2}s of {:.2}s",
                plan.duration_seconds,
                audio.duration_seconds()
            );
        }

        let sample_limit = (plan.duration_seconds * audio.sample_rate as f64).ceil() as usize;
        let samples = &audio.samples[..sample_limit.min(audio.samples.len())];

        log::info!(
            "Extracting amplitudes: {} frames x {} buckets on {} workers",
            plan.total_frames,
            plan.bucket_count,
            self.config.worker_count
        );
        let extractor = AmplitudeExtractor::new(
            self.config.style,
            plan.bucket_count,
            audio.sample_rate,
            plan.fps,
        );
        let raw = extractor.extract(
            samples,
            plan.total_frames,
            self.config.worker_count,
            &self.cancel,
        )?;

        log::info!(
            "Smoothing (window={}) and normalizing...",
            self.config.smoothing_window
        );
        let timeline = raw.smoothed(self.config.smoothing_window).normalized();

        Ok(Analysis { plan, timeline })
    }

    pub fn run(&self, input: &Path, output: Option<&Path>) -> RenderResult<RenderOutcome> {
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| derive_output_path(input, self.config.style));

        log::info!("Input: {}", input.display());
        log::info!("Output: {}", output.display());
        log::info!(
            "Style: {}, resolution {}x{} @ {}fps, {}k, color {}",
            self.config.style.name(),
            self.config.width,
            self.config.height,
            self.config.fps,
            self.config.bitrate_kbps,
            self.config.color
        );

        let audio = self.decode(input)?;
        let analysis = self.analyze(&audio)?;
        drop(audio);
        self.cancel.check()?;

        let plan = analysis.plan;
        let mut encoder = FfmpegEncoder::new(EncodeSettings {
            output: output.clone(),
            audio: input.to_path_buf(),
            width: self.config.width,
            height: self.config.height,
            fps: plan.fps,
            bitrate_kbps: self.config.bitrate_kbps,
            duration_seconds: plan.duration_seconds,
            threads: self.config.worker_count,
        })
        .map_err(RenderError::encode)?;

        let mut renderer = FrameRenderer::new(&self.config);
        let clock = FrameClock::new(plan.fps, plan.total_frames);

        self.progress.set_length(plan.total_frames as u64);
        self.progress.set_position(0);

        for frame_idx in clock.playback() {
            // Dropping the encoder here removes the partial file.
            self.cancel.check()?;
            let frame = renderer.render_frame(analysis.timeline.frame(frame_idx));
            encoder
                .write_frame(frame.as_raw())
                .map_err(RenderError::encode)?;
            self.progress.inc(1);
        }
        self.progress.finish();

        let frames_written = encoder.frames_written();
        log::info!("Finishing encoding...");
        encoder.finish().map_err(RenderError::encode)?;

        Ok(RenderOutcome {
            output,
            frames_written,
            width: self.config.width,
            height: self.config.height,
            fps: plan.fps,
            duration_seconds: plan.duration_seconds,
        })
    }

    /// Renders timeline frame `frame_index` of `input` to a PNG instead of encoding a video.
    pub fn preview(&self, input: &Path, frame_index: usize, png: &Path) -> RenderResult<PathBuf> {
        let audio = self.decode(input)?;
        let analysis = self.analyze(&audio)?;
        if frame_index >= analysis.plan.total_frames {
            return Err(RenderError::config(format!(
                "preview frame {frame_index} is out of range (0..{})",
                analysis.plan.total_frames
            )));
        }

        let mut renderer = FrameRenderer::new(&self.config);
        renderer
            .render_frame(analysis.timeline.frame(frame_index))
            .save_png(png)
            .map_err(RenderError::preview)?;
        log::info!("Wrote preview frame {} to {}", frame_index, png.display());
        Ok(png.to_path_buf())
    }
}

/// Validates `options`, renders `input` and returns the written video path.
///
/// Configuration problems are reported before the audio is opened.
pub fn render(
    input: &Path,
    output: Option<&Path>,
    options: &VisualizationOptions,
) -> RenderResult<PathBuf> {
    let config = VisualizationConfig::from_options(options)?;
    Renderer::new(config)
        .run(input, output)
        .map(|outcome| outcome.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Quality, Style};

    fn config(style: Style, quality: Quality, workers: usize) -> VisualizationConfig {
        VisualizationConfig::from_options(&VisualizationOptions {
            style: Some(style),
            quality: Some(quality),
            worker_count: Some(workers),
            ..Default::default()
        })
        .unwrap()
    }

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> AudioBuffer {
        let n = (sample_rate as f32 * seconds) as usize;
        let samples = (0..n)
            .map(|i| {
                0.8 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect();
        AudioBuffer::new(samples, sample_rate)
    }

    #[test]
    fn plan_uses_rounded_frame_count() {
        let cfg = config(Style::Bars, Quality::Medium, 2);
        let plan = RenderPlan::resolve(&cfg, 5.0);
        assert_eq!(plan.total_frames, 150);
        assert_eq!(plan.bucket_count, 46);
        assert_eq!(plan.fps, 30);
    }

    #[test]
    fn long_audio_is_capped_at_default_max_duration() {
        let cfg = config(Style::Dots, Quality::Low, 4);
        let audio = AudioBuffer::new(vec![0.25; 700 * 1000], 1000);
        let analysis = Renderer::new(cfg).analyze(&audio).unwrap();
        assert_eq!(analysis.plan.duration_seconds, 600.0);
        assert_eq!(analysis.plan.total_frames, 6000);
        assert_eq!(analysis.timeline.len(), 6000);
    }

    #[test]
    fn bars_timeline_is_hann_shaped() {
        let cfg = config(Style::Bars, Quality::Medium, 4);
        let analysis = Renderer::new(cfg).analyze(&sine(440.0, 44100, 5.0)).unwrap();
        let t = &analysis.timeline;
        assert_eq!(t.len(), 150);
        assert!(t.frames().all(|f| f.len() == 46));

        let mid = t.frame(75);
        for center in [22, 23] {
            assert!(mid[center] > mid[0], "{} vs {}", mid[center], mid[0]);
            assert!(mid[center] > mid[45], "{} vs {}", mid[center], mid[45]);
        }
        assert!(t.values().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(t.max(), 1.0);
    }

    #[test]
    fn silence_stays_zero() {
        let cfg = config(Style::Dots, Quality::Low, 2);
        let analysis = Renderer::new(cfg)
            .analyze(&AudioBuffer::new(vec![0.0; 44100 * 2], 44100))
            .unwrap();
        assert_eq!(analysis.timeline.len(), 20);
        assert!(analysis.timeline.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_audio_is_a_decode_error() {
        let cfg = config(Style::Dots, Quality::Low, 1);
        let err = Renderer::new(cfg)
            .analyze(&AudioBuffer::new(Vec::new(), 44100))
            .unwrap_err();
        assert!(matches!(err, RenderError::Decode(_)), "{err}");
    }

    #[test]
    fn bad_color_is_rejected_before_decoding() {
        for color in ["00FF00", "#ZZZZZZ"] {
            let opts = VisualizationOptions {
                color: Some(color.into()),
                ..Default::default()
            };
            let err = render(Path::new("/no/such/input.wav"), None, &opts).unwrap_err();
            assert!(err.is_config(), "{color}: {err}");
        }
    }

    #[test]
    fn missing_input_is_a_decode_error() {
        let err = render(
            Path::new("/no/such/input.wav"),
            None,
            &VisualizationOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Decode(_)), "{err}");
    }

    #[test]
    fn cancelled_render_stops_during_extraction() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let cfg = config(Style::Dots, Quality::Low, 2);
        let renderer = Renderer::new(cfg).with_cancel(cancel);
        let err = renderer.analyze(&sine(200.0, 8000, 2.0)).unwrap_err();
        assert!(matches!(err, RenderError::Cancelled));
    }
}
