//! Matrix Rain Effect
//!
//! Falling columns of green glyphs composited over the frame. Column
//! positions persist between calls; a column that falls past the bottom
//! edge restarts above the top at a random horizontal position.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::effects::traits::{Effect, EffectError, EffectInput};
use crate::frame::Frame;

const COLUMN_COUNT: usize = 50;
const COLUMN_SPACING: i32 = 20;
const GLYPHS_PER_COLUMN: usize = 30;
/// Vertical distance between consecutive glyphs of a column
const GLYPH_STEP: i32 = 20;
/// Height a recycled column restarts at
const RESTART_Y: f32 = -100.0;

/// Glyph bitmap: 3 columns x 5 rows, one bit per cell
const GLYPH_COLS: i32 = 3;
const GLYPH_ROWS: i32 = 5;
/// On-screen size of one bitmap cell in pixels
const GLYPH_CELL: i32 = 3;

/// Fixed glyph set (digits and a few katakana-like shapes)
const GLYPHS: [u16; 16] = [
    0b111_101_101_101_111,
    0b010_110_010_010_111,
    0b111_001_111_100_111,
    0b111_001_111_001_111,
    0b101_101_111_001_001,
    0b111_100_111_001_111,
    0b111_100_111_101_111,
    0b111_001_010_010_010,
    0b111_101_111_101_111,
    0b111_101_111_001_111,
    0b111_010_010_010_110,
    0b101_101_010_010_100,
    0b111_001_011_001_001,
    0b100_111_100_100_011,
    0b010_111_010_010_100,
    0b110_001_110_001_110,
];

/// One falling column of glyphs
#[derive(Debug, Clone)]
struct RainColumn {
    x: i32,
    y: f32,
    speed: f32,
    glyphs: Vec<u16>,
}

/// Matrix rain runtime
pub struct MatrixRainEffect {
    intensity: f32,
    columns: Vec<RainColumn>,
    rng: StdRng,
}

impl MatrixRainEffect {
    pub fn new(intensity: f32) -> Self {
        Self::from_rng(intensity, StdRng::from_os_rng())
    }

    pub fn with_seed(intensity: f32, seed: u64) -> Self {
        Self::from_rng(intensity, StdRng::seed_from_u64(seed))
    }

    fn from_rng(intensity: f32, mut rng: StdRng) -> Self {
        let columns = (0..COLUMN_COUNT)
            .map(|i| RainColumn {
                x: i as i32 * COLUMN_SPACING,
                y: rng.random_range(-100..0) as f32,
                speed: rng.random_range(2.0..5.0),
                glyphs: (0..GLYPHS_PER_COLUMN)
                    .map(|_| GLYPHS[rng.random_range(0..GLYPHS.len())])
                    .collect(),
            })
            .collect();

        Self {
            intensity: intensity.clamp(0.0, 1.0),
            columns,
            rng,
        }
    }

    /// `(x, y)` of every column head
    pub fn column_positions(&self) -> Vec<(i32, f32)> {
        self.columns.iter().map(|c| (c.x, c.y)).collect()
    }
}

/// Draw one glyph with its top-left corner at `(x, y)`, clipped to the frame
fn draw_glyph(overlay: &mut Frame, x: i32, y: i32, glyph: u16, brightness: u8) {
    let (width, height) = (overlay.width() as i32, overlay.height() as i32);
    for row in 0..GLYPH_ROWS {
        for col in 0..GLYPH_COLS {
            let bit = (GLYPH_ROWS - 1 - row) * GLYPH_COLS + (GLYPH_COLS - 1 - col);
            if glyph & (1 << bit) == 0 {
                continue;
            }
            for py in 0..GLYPH_CELL {
                for px in 0..GLYPH_CELL {
                    let gx = x + col * GLYPH_CELL + px;
                    let gy = y + row * GLYPH_CELL + py;
                    if (0..width).contains(&gx) && (0..height).contains(&gy) {
                        overlay.get_pixel_mut(gx as u32, gy as u32).0 = [0, brightness, 0];
                    }
                }
            }
        }
    }
}

impl Effect for MatrixRainEffect {
    fn effect_type(&self) -> &'static str {
        "matrix"
    }

    fn apply(&mut self, frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
        let (width, height) = (frame.width() as i32, frame.height() as i32);
        let mut overlay = frame.clone();

        for column in &mut self.columns {
            let len = column.glyphs.len() as f32;
            for (i, &glyph) in column.glyphs.iter().enumerate() {
                let glyph_y = column.y as i32 + i as i32 * GLYPH_STEP;
                if (0..height).contains(&glyph_y) && (0..width).contains(&column.x) {
                    // Head is brightest; the trail fades out
                    let brightness = (255.0 * (1.0 - i as f32 / len)) as u8;
                    draw_glyph(&mut overlay, column.x, glyph_y, glyph, brightness);
                }
            }

            column.y += column.speed;
            if column.y > height as f32 {
                column.y = RESTART_Y;
                column.x = self.rng.random_range(0..width.max(1));
            }
        }

        let alpha = self.intensity;
        let mut result = frame.clone();
        for (out, over) in result.pixels_mut().zip(overlay.pixels()) {
            for c in 0..3 {
                let blended = out.0[c] as f32 * (1.0 - alpha) + over.0[c] as f32 * alpha;
                out.0[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_initial_columns() {
        let rain = MatrixRainEffect::with_seed(1.0, 1);
        let positions = rain.column_positions();
        assert_eq!(positions.len(), COLUMN_COUNT);
        for (i, &(x, y)) in positions.iter().enumerate() {
            assert_eq!(x, i as i32 * COLUMN_SPACING);
            assert!((-100.0..0.0).contains(&y));
        }
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let frame = Frame::from_fn(64, 64, |x, y| Rgb([x as u8, y as u8, 77]));
        let mut rain = MatrixRainEffect::with_seed(0.0, 4);
        for _ in 0..40 {
            assert_eq!(rain.apply(&frame, &EffectInput::none()).unwrap(), frame);
        }
    }

    #[test]
    fn test_columns_fall_and_recycle() {
        let frame = Frame::from_pixel(200, 10, Rgb([0, 0, 0]));
        let mut rain = MatrixRainEffect::with_seed(1.0, 8);

        let before = rain.column_positions();
        rain.apply(&frame, &EffectInput::none()).unwrap();
        let after = rain.column_positions();
        for (&(_, y0), &(_, y1)) in before.iter().zip(after.iter()) {
            assert!(y1 > y0 || y1 == RESTART_Y);
        }

        // Fastest drop needs < 60 calls to clear 110px at speed >= 2
        for _ in 0..60 {
            rain.apply(&frame, &EffectInput::none()).unwrap();
        }
        let recycled = rain
            .column_positions()
            .iter()
            .filter(|&&(x, _)| x < 200)
            .count();
        assert_eq!(recycled, COLUMN_COUNT);
    }

    #[test]
    fn test_rain_draws_green() {
        let frame = Frame::from_pixel(400, 200, Rgb([0, 0, 0]));
        let mut rain = MatrixRainEffect::with_seed(1.0, 21);
        let mut lit = false;
        for _ in 0..60 {
            let out = rain.apply(&frame, &EffectInput::none()).unwrap();
            lit |= out.pixels().any(|p| p.0[1] > 0);
            assert!(out.pixels().all(|p| p.0[0] == 0 && p.0[2] == 0));
        }
        assert!(lit);
    }
}
