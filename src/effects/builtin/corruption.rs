//! Block Corruption Effect
//!
//! Copies randomly sized rectangles from randomly shifted positions of
//! the input into the output, like a damaged stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::effects::traits::{Effect, EffectError, EffectInput};
use crate::frame::Frame;

/// Blocks per frame at intensity 1.0
const MAX_BLOCKS: f32 = 10.0;
/// Block edge range in pixels
const BLOCK_SIZE_MIN: u32 = 5;
const BLOCK_SIZE_MAX: u32 = 30;
/// Maximum source shift in pixels along each axis
const MAX_SHIFT: i64 = 20;

/// Block corruption runtime
pub struct BlockCorruptionEffect {
    intensity: f32,
    rng: StdRng,
}

impl BlockCorruptionEffect {
    pub fn new(intensity: f32) -> Self {
        Self {
            intensity,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic instance for reproducible output
    pub fn with_seed(intensity: f32, seed: u64) -> Self {
        Self {
            intensity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn block_count(&self) -> usize {
        (MAX_BLOCKS * self.intensity.max(0.0)) as usize
    }
}

impl Effect for BlockCorruptionEffect {
    fn effect_type(&self) -> &'static str {
        "data_corruption"
    }

    fn apply(&mut self, frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
        let (width, height) = frame.dimensions();
        let mut result = frame.clone();

        for _ in 0..self.block_count() {
            let block_w = self.rng.random_range(BLOCK_SIZE_MIN..BLOCK_SIZE_MAX).min(width);
            let block_h = self.rng.random_range(BLOCK_SIZE_MIN..BLOCK_SIZE_MAX).min(height);
            let x = self.rng.random_range(0..=width - block_w);
            let y = self.rng.random_range(0..=height - block_h);

            let shift_x = self.rng.random_range(-MAX_SHIFT..MAX_SHIFT);
            let shift_y = self.rng.random_range(-MAX_SHIFT..MAX_SHIFT);
            let src_x = (x as i64 + shift_x).clamp(0, (width - block_w) as i64) as u32;
            let src_y = (y as i64 + shift_y).clamp(0, (height - block_h) as i64) as u32;

            for dy in 0..block_h {
                for dx in 0..block_w {
                    let pixel = *frame.get_pixel(src_x + dx, src_y + dy);
                    result.put_pixel(x + dx, y + dy, pixel);
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::collections::HashSet;

    fn unique_pixels(width: u32, height: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, ((x + y) % 256) as u8]))
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let frame = unique_pixels(40, 40);
        let mut effect = BlockCorruptionEffect::with_seed(0.0, 1);
        assert_eq!(effect.apply(&frame, &EffectInput::none()).unwrap(), frame);
    }

    #[test]
    fn test_seeded_output_is_reproducible() {
        let frame = unique_pixels(64, 48);
        let mut a = BlockCorruptionEffect::with_seed(1.0, 42);
        let mut b = BlockCorruptionEffect::with_seed(1.0, 42);
        let out_a = a.apply(&frame, &EffectInput::none()).unwrap();
        let out_b = b.apply(&frame, &EffectInput::none()).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_output_pixels_come_from_input() {
        let frame = unique_pixels(64, 48);
        let source: HashSet<[u8; 3]> = frame.pixels().map(|p| p.0).collect();
        let mut effect = BlockCorruptionEffect::with_seed(1.0, 7);
        for _ in 0..5 {
            let out = effect.apply(&frame, &EffectInput::none()).unwrap();
            assert_eq!(out.dimensions(), frame.dimensions());
            assert!(out.pixels().all(|p| source.contains(&p.0)));
        }
    }

    #[test]
    fn test_frames_smaller_than_blocks() {
        for (w, h) in [(1, 1), (3, 2), (4, 40)] {
            let frame = unique_pixels(w, h);
            let mut effect = BlockCorruptionEffect::with_seed(1.0, 3);
            let out = effect.apply(&frame, &EffectInput::none()).unwrap();
            assert_eq!(out.dimensions(), (w, h));
        }
    }
}
