use rayon::prelude::*;
use std::ops::Range;

use super::timeline::AmplitudeTimeline;
use crate::cancel::CancelToken;
use crate::config::Style;
use crate::error::{RenderError, RenderResult};

const MIN_BATCH_SIZE: usize = 10;

/// `round(sample_rate / fps)`
pub fn samples_per_frame(sample_rate: u32, fps: u32) -> usize {
    (sample_rate as f64 / fps as f64).round() as usize
}

/// `round(fps × duration)`
pub fn total_frames(fps: u32, duration_seconds: f64) -> usize {
    (fps as f64 * duration_seconds).round() as usize
}

/// Aims for roughly two batches per worker, never fewer than ten frames each.
pub fn batch_size(total_frames: usize, worker_count: usize) -> usize {
    (total_frames / (2 * worker_count.max(1))).max(MIN_BATCH_SIZE)
}

/// Contiguous frame ranges covering `0..total_frames` in ascending order.
pub fn batch_ranges(total_frames: usize, batch_size: usize) -> Vec<Range<usize>> {
    (0..total_frames)
        .step_by(batch_size.max(1))
        .map(|start| start..(start + batch_size).min(total_frames))
        .collect()
}

/// Raised Hann weighting: `0.5 + 0.5·hann(n)`, edges at 0.5, centre near 1.0.
pub fn bar_weights(n: usize) -> Vec<f32> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| {
            let hann = 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
            (0.5 + 0.5 * hann) as f32
        })
        .collect()
}

/// Reduces raw samples to one amplitude per bucket per video frame.
#[derive(Clone, Debug)]
pub struct AmplitudeExtractor {
    style: Style,
    bucket_count: usize,
    samples_per_frame: usize,
    chunk_size: usize,
    weights: Vec<f32>,
}

impl AmplitudeExtractor {
    pub fn new(style: Style, bucket_count: usize, sample_rate: u32, fps: u32) -> Self {
        let samples_per_frame = samples_per_frame(sample_rate, fps);
        let weights = match style {
            Style::Dots => Vec::new(),
            Style::Bars => bar_weights(bucket_count),
        };
        Self {
            style,
            bucket_count,
            samples_per_frame,
            chunk_size: samples_per_frame / bucket_count.max(1),
            weights,
        }
    }

    /// Fills `out` with the bucket values of frame `frame_idx`.
    ///
    /// Frames or chunks past the end of `samples` produce zeros.
    pub fn frame_amplitudes(&self, samples: &[f32], frame_idx: usize, out: &mut [f32]) {
        out.fill(0.0);

        let start = frame_idx * self.samples_per_frame;
        if start >= samples.len() {
            return;
        }
        let end = (start + self.samples_per_frame).min(samples.len());
        let segment = &samples[start..end];

        for (j, slot) in out.iter_mut().enumerate() {
            let lo = j * self.chunk_size;
            if lo >= segment.len() {
                break;
            }
            let hi = ((j + 1) * self.chunk_size).min(segment.len());
            let chunk = &segment[lo..hi];
            if chunk.is_empty() {
                continue;
            }

            *slot = match self.style {
                Style::Dots => chunk.iter().map(|s| s.abs()).sum::<f32>() / chunk.len() as f32,
                Style::Bars => {
                    let mean_sq = chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32;
                    2.0 * mean_sq.sqrt() * self.weights[j]
                }
            };
        }
    }

    /// Computes frames `range` into one flat buffer. Touches no shared mutable state.
    pub fn extract_batch(
        &self,
        samples: &[f32],
        range: Range<usize>,
        cancel: &CancelToken,
    ) -> RenderResult<Vec<f32>> {
        cancel.check()?;

        let mut values = vec![0.0f32; range.len() * self.bucket_count];
        for (frame_idx, out) in range.zip(values.chunks_exact_mut(self.bucket_count)) {
            self.frame_amplitudes(samples, frame_idx, out);
            if let Some(bucket) = out.iter().position(|v| !v.is_finite()) {
                return Err(RenderError::extraction(format!(
                    "non-finite amplitude at frame {frame_idx}, bucket {bucket}"
                )));
            }
        }
        Ok(values)
    }

    /// Runs every batch on a dedicated pool of `worker_count` threads and concatenates the
    /// results in batch order, so the output does not depend on scheduling.
    pub fn extract(
        &self,
        samples: &[f32],
        total_frames: usize,
        worker_count: usize,
        cancel: &CancelToken,
    ) -> RenderResult<AmplitudeTimeline> {
        let batch_size = batch_size(total_frames, worker_count);
        let batches = batch_ranges(total_frames, batch_size);
        log::debug!(
            "Extracting {} frames x {} buckets in {} batches of <= {} frames on {} workers",
            total_frames,
            self.bucket_count,
            batches.len(),
            batch_size,
            worker_count
        );

        let pool = build_thread_pool(worker_count)?;
        let results = pool.install(|| {
            batches
                .par_iter()
                .map(|range| self.extract_batch(samples, range.clone(), cancel))
                .collect::<RenderResult<Vec<Vec<f32>>>>()
        })?;

        let mut values = Vec::with_capacity(total_frames * self.bucket_count);
        for batch in results {
            values.extend_from_slice(&batch);
        }
        Ok(AmplitudeTimeline::from_flat(self.bucket_count, values))
    }
}

fn build_thread_pool(worker_count: usize) -> RenderResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count.max(1))
        .thread_name(|i| format!("wavecast-extract-{i}"))
        .build()
        .map_err(|e| RenderError::extraction(format!("failed to build worker pool: {e}")))
}
