//! Scratch-card reveal primitive.
//!
//! A full-opacity RGBA cover is progressively erased by pointer strokes; once
//! the erased fraction strictly exceeds the reveal threshold, the card fires
//! its one-shot reveal and fades the remaining cover out. Pure raster state,
//! no I/O — the embedding UI owns input events and presentation.

use rand::Rng;

/// Erase brush radius, in pixels.
pub const BRUSH_RADIUS: f32 = 25.0;

/// A pixel counts as erased once its alpha drops below this midpoint.
pub const ALPHA_MIDPOINT: u8 = 128;

/// Default reveal threshold, in percent of erased cover.
pub const DEFAULT_REVEAL_THRESHOLD: f32 = 50.0;

/// Peak amplitude of the per-pixel brightness noise on the metallic cover.
pub const NOISE_AMPLITUDE: f32 = 30.0;

/// Seconds for the post-reveal fade-out of the remaining cover.
pub const FADE_SECS: f32 = 1.0;

/// How the cover layer is painted.
#[derive(Debug, Clone, Copy)]
pub enum CoverStyle {
    /// A single flat color.
    Flat([u8; 3]),
    /// Diagonal silver gradient with per-pixel brightness noise, imitating a
    /// real scratch-off foil.
    Metallic,
}

// Metallic gradient stops: light silver -> silver -> dark silver.
const METALLIC_STOPS: [[u8; 3]; 3] = [[0xe8, 0xe8, 0xe8], [0xc0, 0xc0, 0xc0], [0xa8, 0xa8, 0xa8]];

const LABEL_INK: [u8; 3] = [0x55, 0x55, 0x55];

pub struct ScratchCard {
    width: u32,
    height: u32,
    /// RGBA, row-major. Alpha is the erase mask: 255 covered, 0 scratched.
    pixels: Vec<u8>,
    threshold_pct: f32,
    stroke_active: bool,
    revealed: bool,
    cover_opacity: f32,
    on_reveal: Option<Box<dyn FnOnce() + Send>>,
}

impl ScratchCard {
    /// Paint a fresh cover at full opacity. Threshold defaults to
    /// [`DEFAULT_REVEAL_THRESHOLD`]; override with [`with_threshold`].
    ///
    /// [`with_threshold`]: ScratchCard::with_threshold
    pub fn new(width: u32, height: u32, style: CoverStyle) -> Self {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        match style {
            CoverStyle::Flat(rgb) => {
                for px in pixels.chunks_exact_mut(4) {
                    px[0] = rgb[0];
                    px[1] = rgb[1];
                    px[2] = rgb[2];
                    px[3] = 255;
                }
            }
            CoverStyle::Metallic => {
                let mut rng = rand::rng();
                let span = (width + height).max(1) as f32;
                for y in 0..height {
                    for x in 0..width {
                        let t = (x + y) as f32 / span;
                        let base = gradient_at(t);
                        let noise = (rng.random::<f32>() - 0.5) * NOISE_AMPLITUDE;
                        let i = ((y * width + x) * 4) as usize;
                        // Same noise on all three channels: brightness, not hue
                        pixels[i] = clamp_channel(base[0] as f32 + noise);
                        pixels[i + 1] = clamp_channel(base[1] as f32 + noise);
                        pixels[i + 2] = clamp_channel(base[2] as f32 + noise);
                        pixels[i + 3] = 255;
                    }
                }
            }
        }

        Self {
            width,
            height,
            pixels,
            threshold_pct: DEFAULT_REVEAL_THRESHOLD,
            stroke_active: false,
            revealed: false,
            cover_opacity: 1.0,
            on_reveal: None,
        }
    }

    pub fn with_threshold(mut self, threshold_pct: f32) -> Self {
        self.threshold_pct = threshold_pct;
        self
    }

    /// Register the one-shot completion callback.
    pub fn set_on_reveal(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.on_reveal = Some(Box::new(callback));
    }

    /// Stamp an instructional label, centered, from a coverage mask
    /// (one byte per mask pixel, 0 = transparent). A one-pixel-offset white
    /// highlight under the ink simulates embossing.
    pub fn stamp_label(&mut self, mask: &[u8], mask_w: u32, mask_h: u32) {
        let x0 = (self.width as i64 - mask_w as i64) / 2;
        let y0 = (self.height as i64 - mask_h as i64) / 2;

        // Highlight first so the ink paints over it
        for my in 0..mask_h {
            for mx in 0..mask_w {
                let coverage = mask[(my * mask_w + mx) as usize];
                if coverage == 0 {
                    continue;
                }
                // White at half strength, offset (+1, +1)
                self.blend_rgb(
                    x0 + mx as i64 + 1,
                    y0 + my as i64 + 1,
                    [255, 255, 255],
                    coverage as f32 / 255.0 * 0.5,
                );
            }
        }
        for my in 0..mask_h {
            for mx in 0..mask_w {
                let coverage = mask[(my * mask_w + mx) as usize];
                if coverage == 0 {
                    continue;
                }
                self.blend_rgb(
                    x0 + mx as i64,
                    y0 + my as i64,
                    LABEL_INK,
                    coverage as f32 / 255.0,
                );
            }
        }
    }

    pub fn begin_stroke(&mut self) {
        if !self.revealed {
            self.stroke_active = true;
        }
    }

    /// Erase a brush disc at the pointer position. No-op outside an active
    /// stroke or after reveal.
    pub fn scratch(&mut self, x: f32, y: f32) {
        if !self.stroke_active || self.revealed {
            return;
        }

        let r = BRUSH_RADIUS;
        let min_x = ((x - r).floor().max(0.0)) as u32;
        let min_y = ((y - r).floor().max(0.0)) as u32;
        let max_x = ((x + r).ceil() as i64).clamp(0, self.width as i64) as u32;
        let max_y = ((y + r).ceil() as i64).clamp(0, self.height as i64) as u32;

        for py in min_y..max_y {
            for px in min_x..max_x {
                let dx = px as f32 + 0.5 - x;
                let dy = py as f32 + 0.5 - y;
                if dx * dx + dy * dy <= r * r {
                    self.pixels[((py * self.width + px) * 4 + 3) as usize] = 0;
                }
            }
        }
    }

    /// End the stroke and run the completion check. The check runs only here,
    /// never during movement, so continuous scratching stays cheap.
    ///
    /// Returns true exactly once: the call that crosses the threshold.
    pub fn end_stroke(&mut self) -> bool {
        self.stroke_active = false;
        if self.revealed {
            return false;
        }

        // Strictly greater: erasing exactly the threshold is not enough
        if self.erased_fraction() * 100.0 > self.threshold_pct {
            self.revealed = true;
            if let Some(callback) = self.on_reveal.take() {
                callback();
            }
            return true;
        }
        false
    }

    /// Fraction of pixels whose alpha has dropped below the midpoint.
    pub fn erased_fraction(&self) -> f32 {
        let total = (self.width * self.height) as usize;
        if total == 0 {
            return 0.0;
        }
        let erased = self
            .pixels
            .chunks_exact(4)
            .filter(|px| px[3] < ALPHA_MIDPOINT)
            .count();
        erased as f32 / total as f32
    }

    /// Advance the post-reveal fade. No effect before reveal.
    pub fn tick(&mut self, dt_secs: f32) {
        if self.revealed && self.cover_opacity > 0.0 {
            self.cover_opacity = (self.cover_opacity - dt_secs / FADE_SECS).max(0.0);
        }
    }

    pub fn revealed(&self) -> bool {
        self.revealed
    }

    /// Opacity the embedding UI should draw the remaining cover with.
    pub fn cover_opacity(&self) -> f32 {
        self.cover_opacity
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn blend_rgb(&mut self, x: i64, y: i64, rgb: [u8; 3], alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        for c in 0..3 {
            let src = rgb[c] as f32;
            let dst = self.pixels[i + c] as f32;
            self.pixels[i + c] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
        }
    }
}

fn gradient_at(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let (from, to, local) = if t < 0.5 {
        (METALLIC_STOPS[0], METALLIC_STOPS[1], t * 2.0)
    } else {
        (METALLIC_STOPS[1], METALLIC_STOPS[2], (t - 0.5) * 2.0)
    };
    [
        lerp_channel(from[0], to[0], local),
        lerp_channel(from[1], to[1], local),
        lerp_channel(from[2], to[2], local),
    ]
}

fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

fn clamp_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
