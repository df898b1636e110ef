//! Liquify Effect
//!
//! Radial mesh deformation around a focal point: one sine period of
//! displacement that decays to zero at the effect radius.

use std::f32::consts::TAU;

use crate::effects::sampling::remap;
use crate::effects::traits::{Effect, EffectCapabilities, EffectError, EffectInput, FocalPoint};
use crate::frame::Frame;

/// Default radius of influence in pixels
pub const DEFAULT_LIQUIFY_RADIUS: f32 = 100.0;

/// Liquify runtime
pub struct LiquifyEffect {
    intensity: f32,
    radius: f32,
}

impl LiquifyEffect {
    pub fn new(intensity: f32) -> Self {
        Self::with_radius(intensity, DEFAULT_LIQUIFY_RADIUS)
    }

    pub fn with_radius(intensity: f32, radius: f32) -> Self {
        Self {
            intensity,
            radius: radius.max(1.0),
        }
    }

    /// Displacement in pixels at a given distance from the focal point
    fn displacement(&self, dist: f32) -> f32 {
        let norm = (dist / self.radius).clamp(0.0, 1.0);
        (norm * TAU).sin() * (1.0 - norm) * self.intensity * self.radius
    }
}

impl Effect for LiquifyEffect {
    fn effect_type(&self) -> &'static str {
        "liquify"
    }

    fn capabilities(&self) -> EffectCapabilities {
        EffectCapabilities::FOCAL_POINT
    }

    fn apply(&mut self, frame: &Frame, input: &EffectInput<'_>) -> Result<Frame, EffectError> {
        let center = input
            .focal_point
            .unwrap_or_else(|| FocalPoint::center_of(frame));

        Ok(remap(frame, |x, y| {
            let dx = x as f32 - center.x;
            let dy = y as f32 - center.y;
            let shift = self.displacement((dx * dx + dy * dy).sqrt());
            let angle = dy.atan2(dx);
            (x as f32 + shift * angle.cos(), y as f32 + shift * angle.sin())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_displacement_vanishes_at_center_and_radius() {
        let liquify = LiquifyEffect::with_radius(1.0, 50.0);
        assert!(liquify.displacement(0.0).abs() < 1e-4);
        assert!(liquify.displacement(50.0).abs() < 1e-4);
        assert!(liquify.displacement(500.0).abs() < 1e-4);
        assert!(liquify.displacement(10.0) > 0.0);
    }

    #[test]
    fn test_liquify_leaves_far_pixels_untouched() {
        let frame = Frame::from_fn(64, 64, |x, y| Rgb([x as u8, y as u8, 0]));
        let mut liquify = LiquifyEffect::with_radius(1.0, 10.0);
        let out = liquify
            .apply(&frame, &EffectInput::with_focal_point(FocalPoint::new(5.0, 5.0)))
            .unwrap();
        assert_eq!(out.get_pixel(60, 60), frame.get_pixel(60, 60));
        assert_ne!(out, frame);
    }

    #[test]
    fn test_liquify_tiny_frames() {
        for (w, h) in [(1, 1), (1, 4), (3, 1)] {
            let frame = Frame::from_pixel(w, h, Rgb([1, 2, 3]));
            let mut liquify = LiquifyEffect::new(1.0);
            let out = liquify
                .apply(&frame, &EffectInput::with_focal_point(FocalPoint::new(-10.0, 99.0)))
                .unwrap();
            assert_eq!(out, frame);
        }
    }
}
