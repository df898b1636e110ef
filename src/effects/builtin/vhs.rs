//! VHS Effect
//!
//! Rolling scanline darkening, horizontal chromatic offset of the red and
//! blue channels, and per-pixel gaussian noise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use crate::effects::traits::{Effect, EffectError, EffectInput};
use crate::frame::Frame;

/// Scanline phase advanced per processed frame
pub const SCANLINE_STEP: f32 = 0.1;

/// Channel offset in pixels at intensity 1.0
const MAX_CHANNEL_SHIFT: f32 = 3.0;
/// Noise standard deviation at intensity 1.0
const MAX_NOISE_SIGMA: f32 = 5.0;

/// VHS runtime
pub struct VhsEffect {
    intensity: f32,
    scanline_offset: f32,
    /// Per-channel noise, absent at zero intensity
    noise: Option<Normal<f32>>,
    rng: StdRng,
}

impl VhsEffect {
    pub fn new(intensity: f32) -> Self {
        Self::from_rng(intensity, StdRng::from_os_rng())
    }

    pub fn with_seed(intensity: f32, seed: u64) -> Self {
        Self::from_rng(intensity, StdRng::seed_from_u64(seed))
    }

    fn from_rng(intensity: f32, rng: StdRng) -> Self {
        let sigma = MAX_NOISE_SIGMA * intensity.max(0.0);
        let noise = Normal::new(0.0, sigma).ok().filter(|_| sigma > 0.0);
        Self {
            intensity,
            scanline_offset: 0.0,
            noise,
            rng,
        }
    }

    pub fn scanline_offset(&self) -> f32 {
        self.scanline_offset
    }

    /// Brightness multiplier of row `y`, in `[0.8, 1.0]`
    fn row_factor(&self, y: u32) -> f32 {
        (y as f32 * 0.1 + self.scanline_offset).sin() * 0.1 + 0.9
    }

    fn noise_sample(&mut self) -> f32 {
        match &self.noise {
            Some(normal) => self.rng.sample(normal),
            None => 0.0,
        }
    }
}

impl Effect for VhsEffect {
    fn effect_type(&self) -> &'static str {
        "vhs"
    }

    fn apply(&mut self, frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
        let (width, height) = frame.dimensions();
        let mut result = frame.clone();

        let shift = (MAX_CHANNEL_SHIFT * self.intensity.max(0.0)) as i64;
        let w = width as i64;

        for y in 0..height {
            let factor = self.row_factor(y);
            for x in 0..width {
                // Red rolls right, blue rolls left; both wrap around
                let red_x = (x as i64 - shift).rem_euclid(w) as u32;
                let blue_x = (x as i64 + shift).rem_euclid(w) as u32;
                let channels = [
                    frame.get_pixel(red_x, y).0[0],
                    frame.get_pixel(x, y).0[1],
                    frame.get_pixel(blue_x, y).0[2],
                ];

                let pixel = result.get_pixel_mut(x, y);
                for (c, value) in channels.into_iter().enumerate() {
                    let noisy = value as f32 * factor + self.noise_sample();
                    pixel.0[c] = noisy.round().clamp(0.0, 255.0) as u8;
                }
            }
        }

        self.scanline_offset += SCANLINE_STEP;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_zero_intensity_applies_only_scanlines() {
        let frame = Frame::from_pixel(4, 2, Rgb([100, 100, 100]));
        let mut vhs = VhsEffect::with_seed(0.0, 9);

        let first = vhs.apply(&frame, &EffectInput::none()).unwrap();
        // Row 0, offset 0: factor 0.9
        assert_eq!(first.get_pixel(0, 0).0, [90, 90, 90]);

        let second = vhs.apply(&frame, &EffectInput::none()).unwrap();
        // Row 0, offset 0.1: factor ~0.90998
        assert_eq!(second.get_pixel(0, 0).0, [91, 91, 91]);
        assert!((vhs.scanline_offset() - 2.0 * SCANLINE_STEP).abs() < 1e-6);
    }

    #[test]
    fn test_row_factor_range() {
        let vhs = VhsEffect::with_seed(1.0, 0);
        for y in 0..500 {
            let f = vhs.row_factor(y);
            assert!((0.8..=1.0).contains(&f));
        }
    }

    #[test]
    fn test_channels_are_offset() {
        // Red ramps along x, green/blue constant; intensity 0.34 gives a 1px shift
        let frame = Frame::from_fn(8, 1, |x, _| Rgb([(x * 30) as u8, 0, 0]));
        let mut vhs = VhsEffect::with_seed(0.34, 5);
        let out = vhs.apply(&frame, &EffectInput::none()).unwrap();

        for x in 1..8u32 {
            let expected = ((x - 1) * 30) as f32 * 0.9;
            let got = out.get_pixel(x, 0).0[0] as f32;
            assert!((got - expected).abs() <= 10.0, "x={x}: {got} vs {expected}");
        }
    }

    #[test]
    fn test_noise_is_bounded_and_reproducible() {
        let frame = Frame::from_pixel(32, 32, Rgb([128, 128, 128]));
        let mut a = VhsEffect::with_seed(1.0, 11);
        let mut b = VhsEffect::with_seed(1.0, 11);
        let out_a = a.apply(&frame, &EffectInput::none()).unwrap();
        let out_b = b.apply(&frame, &EffectInput::none()).unwrap();
        assert_eq!(out_a, out_b);
        assert_eq!(out_a.dimensions(), (32, 32));
    }

    #[test]
    fn test_noise_is_centered() {
        let frame = Frame::from_pixel(64, 64, Rgb([128, 128, 128]));
        let clean = VhsEffect::with_seed(0.0, 3)
            .apply(&frame, &EffectInput::none())
            .unwrap();
        let noisy = VhsEffect::with_seed(1.0, 3)
            .apply(&frame, &EffectInput::none())
            .unwrap();

        let mean = |img: &Frame| {
            img.as_raw().iter().map(|&v| v as f64).sum::<f64>() / img.as_raw().len() as f64
        };
        assert!((mean(&noisy) - mean(&clean)).abs() < 0.5);
        assert_ne!(noisy, clean);
    }

    #[test]
    fn test_single_pixel_frame() {
        let frame = Frame::from_pixel(1, 1, Rgb([200, 10, 50]));
        let mut vhs = VhsEffect::with_seed(1.0, 2);
        let out = vhs.apply(&frame, &EffectInput::none()).unwrap();
        assert_eq!(out.dimensions(), (1, 1));
    }
}
