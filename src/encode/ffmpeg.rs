use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

/// Everything ffmpeg needs to mux rendered frames with the source audio.
#[derive(Clone, Debug)]
pub struct EncodeSettings {
    pub output: PathBuf,
    pub audio: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    /// Audio is cut to `[0, duration_seconds)`.
    pub duration_seconds: f64,
    pub threads: usize,
}

impl EncodeSettings {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("encode width/height must be non-zero");
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            anyhow::bail!("encode width/height must be even for yuv420p output");
        }
        if self.fps == 0 {
            anyhow::bail!("encode fps must be non-zero");
        }
        if self.duration_seconds.is_nan() || self.duration_seconds <= 0.0 {
            anyhow::bail!("encode duration must be positive");
        }
        Ok(())
    }

    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".into(), "error".into(),
            "-f".into(), "rawvideo".into(),
            "-pixel_format".into(), "rgb24".into(),
            "-video_size".into(), format!("{}x{}", self.width, self.height),
            "-framerate".into(), self.fps.to_string(),
            "-i".into(), "pipe:0".into(),
            "-t".into(), format!("{:.6}", self.duration_seconds),
            "-i".into(), self.audio.to_string_lossy().into_owned(),
            "-map".into(), "0:v:0".into(),
            "-map".into(), "1:a:0".into(),
            "-c:v".into(), "libx264".into(),
            "-pix_fmt".into(), "yuv420p".into(),
            "-b:v".into(), format!("{}k", self.bitrate_kbps),
            "-c:a".into(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-threads".into(), self.threads.max(1).to_string(),
            "-movflags".into(), "+faststart".into(),
            "-shortest".into(),
            self.output.to_string_lossy().into_owned(),
        ]
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Streams raw RGB frames into an `ffmpeg` child process.
///
/// Dropping the encoder without calling [`FfmpegEncoder::finish`] kills ffmpeg and removes
/// the partially written output.
pub struct FfmpegEncoder {
    settings: EncodeSettings,
    child: Child,
    stdin: Option<ChildStdin>,
    frames_written: usize,
    finished: bool,
}

impl FfmpegEncoder {
    pub fn new(settings: EncodeSettings) -> Result<Self> {
        settings.validate()?;

        if let Some(parent) = settings.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }

        let mut child = Command::new("ffmpeg")
            .args(settings.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        let stdin = child.stdin.take().context("FFmpeg stdin not available")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, {}k",
            settings.width,
            settings.height,
            settings.fps,
            settings.bitrate_kbps
        );

        Ok(Self {
            settings,
            child,
            stdin: Some(stdin),
            frames_written: 0,
            finished: false,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn write_frame(&mut self, rgb_pixels: &[u8]) -> Result<()> {
        if rgb_pixels.len() != self.settings.frame_bytes() {
            anyhow::bail!(
                "frame size mismatch: got {} bytes, expected {}",
                rgb_pixels.len(),
                self.settings.frame_bytes()
            );
        }
        let stdin = self.stdin.as_mut().context("FFmpeg stdin not available")?;
        if let Err(err) = stdin.write_all(rgb_pixels) {
            // A broken pipe means ffmpeg already quit; its stderr says why
            drop(self.stdin.take());
            let status = self.child.wait().context("Failed to wait for ffmpeg")?;
            let stderr = read_stderr(&mut self.child);
            return Err(err).with_context(|| {
                format!(
                    "Failed to write frame {} to ffmpeg (exited with {}):\n{}",
                    self.frames_written,
                    status,
                    stderr.trim()
                )
            });
        }
        self.frames_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        // Close stdin to signal EOF
        drop(self.stdin.take());

        let status = self.child.wait().context("Failed to wait for ffmpeg")?;
        let stderr = read_stderr(&mut self.child);

        if !status.success() {
            anyhow::bail!("FFmpeg exited with {}:\n{}", status, stderr.trim());
        }

        self.finished = true;
        log::info!("FFmpeg encoding complete ({} frames)", self.frames_written);
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if self.settings.output.exists() {
            log::warn!(
                "Removing incomplete output {}",
                self.settings.output.display()
            );
            let _ = std::fs::remove_file(&self.settings.output);
        }
    }
}

fn read_stderr(child: &mut Child) -> String {
    use std::io::Read;
    let mut buf = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut buf);
    }
    buf
}
