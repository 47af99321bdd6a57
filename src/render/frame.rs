use super::bars::BarLayout;
use super::canvas::Canvas;
use super::dots::DotLayout;
use crate::config::{Style, VisualizationConfig};

enum Painter {
    Dots(DotLayout),
    Bars(BarLayout),
}

/// Draws one amplitude frame at a time into a single reusable canvas.
///
/// The canvas is cleared at the start of every frame, so nothing drawn for frame `i` is
/// visible in frame `i + 1`.
pub struct FrameRenderer {
    canvas: Canvas,
    painter: Painter,
    color: [u8; 3],
    rng: fastrand::Rng,
    bucket_count: usize,
}

impl FrameRenderer {
    pub fn new(config: &VisualizationConfig) -> Self {
        let painter = match config.style {
            Style::Dots => Painter::Dots(DotLayout::new(config)),
            Style::Bars => Painter::Bars(BarLayout::new(config)),
        };
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            canvas: Canvas::new(config.width, config.height),
            painter,
            color: config.color.0,
            rng,
            bucket_count: config.bucket_count(),
        }
    }

    /// Renders `amplitudes` (normalized, one per bucket) and returns the finished frame.
    pub fn render_frame(&mut self, amplitudes: &[f32]) -> &Canvas {
        debug_assert_eq!(amplitudes.len(), self.bucket_count);
        self.canvas.clear();
        match &self.painter {
            Painter::Dots(layout) => {
                layout.draw(&mut self.canvas, amplitudes, self.color, &mut self.rng)
            }
            Painter::Bars(layout) => layout.draw(&mut self.canvas, amplitudes, self.color),
        }
        &self.canvas
    }
}

/// Maps playback time onto timeline frame indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameClock {
    pub fps: u32,
    pub total_frames: usize,
}

impl FrameClock {
    pub fn new(fps: u32, total_frames: usize) -> Self {
        Self { fps, total_frames }
    }

    /// `floor(t × fps)`, clamped to the last valid index.
    pub fn frame_index_at(&self, t: f64) -> usize {
        let last = self.total_frames.saturating_sub(1);
        if t <= 0.0 {
            return 0;
        }
        // The epsilon keeps k/fps from landing on k - 1 after rounding.
        let idx = (t * self.fps as f64 + 1e-9).floor() as usize;
        idx.min(last)
    }

    /// Timeline indices for every output frame, in playback order.
    pub fn playback(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.total_frames).map(move |k| self.frame_index_at(k as f64 / self.fps as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizationOptions;

    fn renderer(style: Style) -> FrameRenderer {
        let cfg = VisualizationConfig::from_options(&VisualizationOptions {
            style: Some(style),
            quality: Some(crate::config::Quality::Low),
            seed: Some(9),
            ..Default::default()
        })
        .unwrap();
        FrameRenderer::new(&cfg)
    }

    #[test]
    fn canvas_is_cleared_between_frames() {
        let mut r = renderer(Style::Bars);
        let loud = vec![1.0; 46];
        let lit = r.render_frame(&loud).as_raw().iter().filter(|&&b| b > 0).count();
        assert!(lit > 0);

        let silent = vec![0.0; 46];
        let frame = r.render_frame(&silent);
        assert!(frame.as_raw().iter().all(|&b| b == 0));
        assert_eq!(frame.as_raw().len(), 854 * 480 * 3);
    }

    #[test]
    fn seeded_dots_are_reproducible() {
        let amps: Vec<f32> = (0..71).map(|j| j as f32 / 70.0).collect();
        let a = renderer(Style::Dots).render_frame(&amps).as_raw().to_vec();
        let b = renderer(Style::Dots).render_frame(&amps).as_raw().to_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn clock_maps_time_to_index() {
        let clock = FrameClock::new(30, 150);
        assert_eq!(clock.frame_index_at(0.0), 0);
        assert_eq!(clock.frame_index_at(0.05), 1);
        assert_eq!(clock.frame_index_at(1.0), 30);
        assert_eq!(clock.frame_index_at(4.99), 149);
        assert_eq!(clock.frame_index_at(9.0), 149);
    }

    #[test]
    fn playback_visits_each_index_once_in_order() {
        for (fps, n) in [(10, 37), (24, 100), (30, 150), (60, 7)] {
            let clock = FrameClock::new(fps, n);
            let seq: Vec<usize> = clock.playback().collect();
            assert_eq!(seq, (0..n).collect::<Vec<_>>(), "fps {fps}");
        }
    }
}
