/// Per-frame bucket amplitudes for a whole render, stored frame-major.
///
/// Every frame has exactly `bucket_count` values; bucket `j` sits at the same x-position in
/// every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AmplitudeTimeline {
    bucket_count: usize,
    values: Vec<f32>,
}

impl AmplitudeTimeline {
    /// `values.len()` must be a multiple of `bucket_count`.
    pub fn from_flat(bucket_count: usize, values: Vec<f32>) -> Self {
        assert!(bucket_count > 0, "timeline needs at least one bucket");
        assert_eq!(
            values.len() % bucket_count,
            0,
            "flat amplitude buffer is not a whole number of frames"
        );
        Self {
            bucket_count,
            values,
        }
    }

    pub fn from_frames(bucket_count: usize, frames: &[Vec<f32>]) -> Self {
        let mut values = Vec::with_capacity(frames.len() * bucket_count);
        for frame in frames {
            assert_eq!(frame.len(), bucket_count, "ragged amplitude frame");
            values.extend_from_slice(frame);
        }
        Self::from_flat(bucket_count, values)
    }

    pub fn len(&self) -> usize {
        self.values.len() / self.bucket_count
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.bucket_count;
        &self.values[start..start + self.bucket_count]
    }

    pub fn frames(&self) -> std::slice::ChunksExact<'_, f32> {
        self.values.chunks_exact(self.bucket_count)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Largest value over all frames and buckets; `0.0` for an empty timeline.
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0f32, f32::max)
    }

    /// Weighted moving average over `window_size` neighbouring frames.
    ///
    /// The frame being smoothed keeps half of the weight and its neighbours share the other
    /// half. A window of 1 returns an identical timeline.
    pub fn smoothed(&self, window_size: usize) -> Self {
        if window_size <= 1 || self.len() <= 1 {
            return self.clone();
        }

        let n = self.len();
        let half = window_size / 2;
        let mut out = vec![0.0f32; self.values.len()];

        for (i, target) in out.chunks_exact_mut(self.bucket_count).enumerate() {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            let weights = window_weights(end - start, i.checked_sub(start));

            for (j, w) in (start..end).zip(weights) {
                for (t, v) in target.iter_mut().zip(self.frame(j)) {
                    *t += v * w;
                }
            }
        }

        Self {
            bucket_count: self.bucket_count,
            values: out,
        }
    }

    /// Divides everything by the global maximum so the loudest bucket becomes `1.0`.
    /// An all-zero timeline is left untouched.
    pub fn normalize(&mut self) {
        let max = self.max();
        if max <= 0.0 {
            return;
        }
        for v in &mut self.values {
            *v /= max;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

/// Weights for a window of `len` frames where `center` (if it lies inside the window) gets
/// half of the total.
fn window_weights(len: usize, center: Option<usize>) -> Vec<f32> {
    match center {
        Some(c) if c < len && len > 1 => {
            let side = 0.5 / (len - 1) as f32;
            (0..len).map(|k| if k == c { 0.5 } else { side }).collect()
        }
        _ => vec![1.0 / len as f32; len],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(frames: &[&[f32]]) -> AmplitudeTimeline {
        let owned: Vec<Vec<f32>> = frames.iter().map(|f| f.to_vec()).collect();
        AmplitudeTimeline::from_frames(frames[0].len(), &owned)
    }

    #[test]
    fn shape_accessors() {
        let t = timeline(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.bucket_count(), 2);
        assert_eq!(t.frame(1), &[3.0, 4.0]);
        assert_eq!(t.frames().count(), 3);
        assert_eq!(t.max(), 6.0);
    }

    #[test]
    fn window_of_one_is_identity() {
        let t = timeline(&[&[0.1, 0.9], &[0.4, 0.2], &[0.7, 0.3]]);
        assert_eq!(t.smoothed(1), t);
    }

    #[test]
    fn interior_frame_keeps_half_weight() {
        let t = timeline(&[&[0.0], &[0.0], &[1.0], &[0.0], &[0.0]]);
        let s = t.smoothed(5);
        assert!((s.frame(2)[0] - 0.5).abs() < 1e-6);
        // Frames 0 and 4 see the spike through a 3-wide clamped window: 0.5 / 2 each.
        assert!((s.frame(0)[0] - 0.25).abs() < 1e-6);
        assert!((s.frame(4)[0] - 0.25).abs() < 1e-6);
        // Frame 1 has a 4-wide window: 0.5 / 3.
        assert!((s.frame(1)[0] - 0.5 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn smoothing_preserves_constant_signal_and_shape() {
        let frames: Vec<Vec<f32>> = (0..7).map(|_| vec![0.3, 0.6, 0.9]).collect();
        let t = AmplitudeTimeline::from_frames(3, &frames);
        let s = t.smoothed(3);
        assert_eq!(s.len(), t.len());
        assert_eq!(s.bucket_count(), 3);
        for (a, b) in s.values().iter().zip(t.values()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn single_frame_timeline_is_not_smoothed() {
        let t = timeline(&[&[0.4, 0.8]]);
        assert_eq!(t.smoothed(5), t);
    }

    #[test]
    fn uniform_weights_when_center_outside_window() {
        assert_eq!(window_weights(4, None), vec![0.25; 4]);
        assert_eq!(window_weights(2, Some(5)), vec![0.5; 2]);
        assert_eq!(window_weights(3, Some(0)), vec![0.5, 0.25, 0.25]);
    }

    #[test]
    fn normalization_maps_global_max_to_one() {
        let t = timeline(&[&[0.5, 2.0], &[1.0, 0.0]]).normalized();
        assert_eq!(t.values(), &[0.25, 1.0, 0.5, 0.0]);
        assert!(t.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn normalizing_silence_keeps_zeros() {
        let t = timeline(&[&[0.0, 0.0], &[0.0, 0.0]]).normalized();
        assert!(t.values().iter().all(|&v| v == 0.0));
    }
}
