//! Gravity Flip Effect
//!
//! Flips the frame upside down, then sways columns sideways with a
//! strength that grows toward the bottom edge.

use image::imageops;

use crate::effects::sampling::remap;
use crate::effects::traits::{Effect, EffectError, EffectInput};
use crate::frame::Frame;

/// Horizontal sway frequency (radians per pixel column)
const SWAY_FREQUENCY: f32 = 0.05;
/// Maximum sway in pixels at the bottom row, intensity 1.0
const SWAY_AMPLITUDE: f32 = 10.0;

/// Gravity flip runtime
pub struct GravityFlipEffect {
    intensity: f32,
}

impl GravityFlipEffect {
    pub fn new(intensity: f32) -> Self {
        Self { intensity }
    }
}

impl Effect for GravityFlipEffect {
    fn effect_type(&self) -> &'static str {
        "flipGravity"
    }

    fn apply(&mut self, frame: &Frame, _input: &EffectInput<'_>) -> Result<Frame, EffectError> {
        let flipped = imageops::flip_vertical(frame);
        let height = frame.height() as f32;
        let strength = self.intensity * SWAY_AMPLITUDE;

        Ok(remap(&flipped, |x, y| {
            let pull = (y as f32 / height) * strength;
            (x as f32 + (x as f32 * SWAY_FREQUENCY).sin() * pull, y as f32)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_gravity_flips_rows() {
        let frame = Frame::from_fn(4, 3, |_, y| Rgb([y as u8 * 50, 0, 0]));
        let mut gravity = GravityFlipEffect::new(0.0);
        let out = gravity.apply(&frame, &EffectInput::none()).unwrap();
        assert_eq!(out.get_pixel(0, 0).0[0], 100);
        assert_eq!(out.get_pixel(0, 2).0[0], 0);
    }

    #[test]
    fn test_gravity_top_row_has_no_sway() {
        let frame = Frame::from_fn(32, 8, |x, y| Rgb([x as u8 * 4, y as u8 * 30, 0]));
        let mut gravity = GravityFlipEffect::new(1.0);
        let out = gravity.apply(&frame, &EffectInput::none()).unwrap();
        let flipped = imageops::flip_vertical(&frame);
        for x in 0..32 {
            assert_eq!(out.get_pixel(x, 0), flipped.get_pixel(x, 0));
        }
        assert_eq!(out.dimensions(), (32, 8));
    }
}
