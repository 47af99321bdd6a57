//! Reusable RGB drawing surface (image)

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;

/// Fixed-size RGB8 pixel buffer owned by one renderer and reused for every frame.
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resets every pixel to black.
    pub fn clear(&mut self) {
        let raw: &mut [u8] = &mut self.image;
        raw.fill(0);
    }

    /// Tightly packed `width × height × 3` bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    /// Adds `color · weight` to one pixel, saturating at 255.
    fn add(&mut self, x: u32, y: u32, color: [u8; 3], weight: f32) {
        let px = self.image.get_pixel_mut(x, y);
        for (dst, &src) in px.0.iter_mut().zip(&color) {
            let add = (src as f32 * weight).round() as u16;
            *dst = (*dst as u16 + add).min(255) as u8;
        }
    }

    /// Anti-aliased filled disc composited additively at `opacity`.
    pub fn add_disc(&mut self, cx: f32, cy: f32, radius: f32, color: [u8; 3], opacity: f32) {
        let (w, h) = (self.width() as i64, self.height() as i64);
        let reach = radius + 1.0;
        let x0 = ((cx - reach).floor() as i64).max(0);
        let x1 = ((cx + reach).ceil() as i64).min(w - 1);
        let y0 = ((cy - reach).floor() as i64).max(0);
        let y1 = ((cy + reach).ceil() as i64).min(h - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.add(x as u32, y as u32, color, coverage * opacity);
                }
            }
        }
    }

    /// Fills `[x0, x1) × [y0, y1)` (pixel-snapped) with `color` blended over the existing pixels.
    pub fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: [u8; 3], opacity: f32) {
        let clamp_x = |v: f32| v.round().clamp(0.0, self.width() as f32) as u32;
        let clamp_y = |v: f32| v.round().clamp(0.0, self.height() as f32) as u32;
        let (x0, x1) = (clamp_x(x0), clamp_x(x1));
        let (y0, y1) = (clamp_y(y0), clamp_y(y1));

        let keep = 1.0 - opacity;
        for y in y0..y1 {
            for x in x0..x1 {
                let px = self.image.get_pixel_mut(x, y);
                for (dst, &src) in px.0.iter_mut().zip(&color) {
                    *dst = (*dst as f32 * keep + src as f32 * opacity).round() as u8;
                }
            }
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write preview image: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_blackens_everything() {
        let mut c = Canvas::new(8, 4);
        c.fill_rect(0.0, 0.0, 8.0, 4.0, [10, 20, 30], 1.0);
        assert_eq!(c.pixel(3, 2), [10, 20, 30]);
        c.clear();
        assert!(c.as_raw().iter().all(|&b| b == 0));
        assert_eq!(c.as_raw().len(), 8 * 4 * 3);
    }

    #[test]
    fn disc_is_solid_at_center_and_empty_far_away() {
        let mut c = Canvas::new(20, 20);
        c.add_disc(10.0, 10.0, 3.0, [0, 255, 0], 1.0);
        assert_eq!(c.pixel(10, 10), [0, 255, 0]);
        assert_eq!(c.pixel(0, 0), [0, 0, 0]);
        assert_eq!(c.pixel(10, 15), [0, 0, 0]);
    }

    #[test]
    fn additive_blend_saturates() {
        let mut c = Canvas::new(5, 5);
        c.add_disc(2.0, 2.0, 1.0, [200, 100, 0], 0.5);
        assert_eq!(c.pixel(2, 2), [100, 50, 0]);
        c.add_disc(2.0, 2.0, 1.0, [200, 100, 0], 1.0);
        assert_eq!(c.pixel(2, 2), [255, 150, 0]);
    }

    #[test]
    fn disc_near_edge_is_clipped() {
        let mut c = Canvas::new(4, 4);
        c.add_disc(0.0, 0.0, 3.0, [255, 255, 255], 1.0);
        c.add_disc(3.0, 3.0, 3.0, [255, 255, 255], 1.0);
        assert_eq!(c.pixel(0, 0), [255, 255, 255]);
    }

    #[test]
    fn rect_blends_over_background() {
        let mut c = Canvas::new(4, 4);
        c.fill_rect(1.0, 1.0, 3.0, 3.0, [100, 200, 0], 0.9);
        assert_eq!(c.pixel(1, 1), [90, 180, 0]);
        assert_eq!(c.pixel(0, 0), [0, 0, 0]);
        assert_eq!(c.pixel(3, 3), [0, 0, 0]);
    }
}
