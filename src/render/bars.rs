use super::canvas::Canvas;
use crate::config::VisualizationConfig;

const SLOT_PITCH: f32 = 1.5;
const BAR_WIDTH: f32 = 0.9;
const VIEW_HALF_HEIGHT: f32 = 1.1;
const BAR_OPACITY: f32 = 0.9;

/// Mirrored bar geometry. Bars sit on a 1.5-unit pitch inside a view spanning one unit of
/// margin on the left and two on the right; heights map `[-1.1, 1.1]` onto the frame.
#[derive(Clone, Debug)]
pub struct BarLayout {
    lefts: Vec<f32>,
    bar_width: f32,
    center_y: f32,
    y_scale: f32,
}

impl BarLayout {
    pub fn new(config: &VisualizationConfig) -> Self {
        let n = config.bucket_count();
        let view_width = SLOT_PITCH * n.saturating_sub(1) as f32 + 3.0;
        let x_scale = config.width as f32 / view_width;
        let lefts = (0..n)
            .map(|j| (SLOT_PITCH * j as f32 - BAR_WIDTH / 2.0 + 1.0) * x_scale)
            .collect();

        Self {
            lefts,
            bar_width: BAR_WIDTH * x_scale,
            center_y: config.height as f32 / 2.0,
            y_scale: config.height as f32 / (2.0 * VIEW_HALF_HEIGHT),
        }
    }

    /// Pixel height of one half of a bar.
    pub fn bar_height(&self, amplitude: f32) -> f32 {
        amplitude.max(0.0) * self.y_scale
    }

    pub fn bar_span(&self, bucket: usize) -> (f32, f32) {
        let left = self.lefts[bucket];
        (left, left + self.bar_width)
    }

    pub fn draw(&self, canvas: &mut Canvas, amplitudes: &[f32], color: [u8; 3]) {
        for (&left, &amp) in self.lefts.iter().zip(amplitudes) {
            let h = self.bar_height(amp);
            let right = left + self.bar_width;
            canvas.fill_rect(left, self.center_y - h, right, self.center_y, color, BAR_OPACITY);
            canvas.fill_rect(left, self.center_y, right, self.center_y + h, color, BAR_OPACITY);
        }
    }
}
