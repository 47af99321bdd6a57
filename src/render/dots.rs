use super::canvas::Canvas;
use crate::config::VisualizationConfig;

/// Fixed dot-matrix geometry for one render.
#[derive(Clone, Debug)]
pub struct DotLayout {
    xs: Vec<f32>,
    radius: f32,
    center_y: f32,
    step: f32,
    half_height: f32,
    y_min: f32,
    y_max: f32,
}

impl DotLayout {
    pub fn new(config: &VisualizationConfig) -> Self {
        let pitch = config.dot_size + config.dot_spacing;
        let xs = (0..config.bucket_count())
            .map(|j| (j as u32 * pitch + config.dot_size / 2) as f32)
            .collect();
        let radius = ((config.dot_size + 1) / 2) as f32;
        let max_viz_height = config.height * config.max_height_percent / 100;

        Self {
            xs,
            radius,
            center_y: (config.height / 2) as f32,
            step: pitch as f32,
            half_height: (max_viz_height / 2) as f32,
            y_min: radius,
            y_max: config.height as f32 - radius,
        }
    }

    pub fn column_x(&self, bucket: usize) -> f32 {
        self.xs[bucket]
    }

    /// Mirrored pairs drawn above/below the centre dot for a normalized amplitude.
    pub fn pair_count(&self, amplitude: f32) -> usize {
        let offset = (amplitude * self.half_height).floor().min(self.half_height).max(0.0);
        (offset / self.step).floor() as usize
    }

    /// Centre dot plus mirrored pairs per column, each dot at full or half opacity by coin flip.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        amplitudes: &[f32],
        color: [u8; 3],
        rng: &mut fastrand::Rng,
    ) {
        for (&x, &amp) in self.xs.iter().zip(amplitudes) {
            canvas.add_disc(x, self.center_y, self.radius, color, coin_opacity(rng));

            for level in 1..=self.pair_count(amp) {
                let dy = level as f32 * self.step;
                let below = (self.center_y + dy).clamp(self.y_min, self.y_max);
                let above = (self.center_y - dy).clamp(self.y_min, self.y_max);
                let opacity = coin_opacity(rng);
                canvas.add_disc(x, below, self.radius, color, opacity);
                canvas.add_disc(x, above, self.radius, color, opacity);
            }
        }
    }
}

fn coin_opacity(rng: &mut fastrand::Rng) -> f32 {
    if rng.bool() {
        1.0
    } else {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualizationOptions;

    fn layout() -> (VisualizationConfig, DotLayout) {
        let cfg = VisualizationConfig::from_options(&VisualizationOptions::default()).unwrap();
        let layout = DotLayout::new(&cfg);
        (cfg, layout)
    }

    #[test]
    fn geometry_matches_medium_preset() {
        let (_, l) = layout();
        assert_eq!(l.xs.len(), 106);
        assert_eq!(l.column_x(0), 3.0);
        assert_eq!(l.column_x(1), 15.0);
        assert_eq!(l.radius, 3.0);
        assert_eq!(l.center_y, 360.0);
        // 30% of 720 = 216, half = 108
        assert_eq!(l.half_height, 108.0);
    }

    #[test]
    fn pair_count_grows_with_amplitude_and_is_capped() {
        let (_, l) = layout();
        assert_eq!(l.pair_count(0.0), 0);
        assert_eq!(l.pair_count(0.05), 0);
        assert_eq!(l.pair_count(0.5), 4);
        assert_eq!(l.pair_count(1.0), 9);
        assert_eq!(l.pair_count(3.0), 9);
    }

    #[test]
    fn silent_frame_draws_only_center_row() {
        let (cfg, l) = layout();
        let mut canvas = Canvas::new(cfg.width, cfg.height);
        let mut rng = fastrand::Rng::with_seed(7);
        l.draw(&mut canvas, &vec![0.0; 106], [0, 255, 255], &mut rng);

        assert_ne!(canvas.pixel(3, 360), [0, 0, 0]);
        assert_eq!(canvas.pixel(3, 360 - 12), [0, 0, 0]);
        assert_eq!(canvas.pixel(3, 360 + 12), [0, 0, 0]);
    }

    #[test]
    fn loud_column_is_mirrored() {
        let (cfg, l) = layout();
        let mut canvas = Canvas::new(cfg.width, cfg.height);
        let mut amps = vec![0.0; 106];
        amps[10] = 1.0;
        let mut rng = fastrand::Rng::with_seed(1);
        l.draw(&mut canvas, &amps, [255, 255, 255], &mut rng);

        let x = l.column_x(10) as u32;
        for level in 1..=9u32 {
            let up = canvas.pixel(x, 360 - level * 12);
            let down = canvas.pixel(x, 360 + level * 12);
            assert_eq!(up, down, "level {level} should be symmetric");
            assert!(up[0] == 255 || up[0] == 128, "unexpected opacity {up:?}");
        }
        assert_eq!(canvas.pixel(x, 360 - 10 * 12), [0, 0, 0]);
    }

    #[test]
    fn opacity_dither_is_roughly_balanced() {
        let mut rng = fastrand::Rng::with_seed(42);
        let full = (0..10_000).filter(|_| coin_opacity(&mut rng) == 1.0).count();
        assert!((4_500..5_500).contains(&full), "full-opacity count {full}");
    }
}
