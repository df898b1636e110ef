//! Portal Ripple Effect
//!
//! Concentric sine waves radiating from a focal point. The wave phase
//! advances on every call, so the ripple keeps moving on a static input.

use crate::effects::sampling::remap;
use crate::effects::traits::{Effect, EffectCapabilities, EffectError, EffectInput, FocalPoint};
use crate::frame::Frame;

/// Phase advanced per processed frame
pub const RIPPLE_PHASE_STEP: f32 = 0.1;

/// Radial frequency of the wave (radians per pixel)
const WAVE_FREQUENCY: f32 = 0.1;
/// Maximum displacement in pixels at intensity 1.0
const WAVE_AMPLITUDE: f32 = 20.0;

/// Portal ripple runtime
pub struct RippleEffect {
    intensity: f32,
    time: f32,
}

impl RippleEffect {
    pub fn new(intensity: f32) -> Self {
        Self { intensity, time: 0.0 }
    }

    /// Current internal phase
    pub fn time(&self) -> f32 {
        self.time
    }
}

impl Effect for RippleEffect {
    fn effect_type(&self) -> &'static str {
        "portal_ripple"
    }

    fn capabilities(&self) -> EffectCapabilities {
        EffectCapabilities::FOCAL_POINT
    }

    fn apply(&mut self, frame: &Frame, input: &EffectInput<'_>) -> Result<Frame, EffectError> {
        let center = input
            .focal_point
            .unwrap_or_else(|| FocalPoint::center_of(frame));
        let amplitude = self.intensity * WAVE_AMPLITUDE;
        let phase = self.time * 2.0;

        let result = remap(frame, |x, y| {
            let dx = x as f32 - center.x;
            let dy = y as f32 - center.y;
            let dist = (dx * dx + dy * dy).sqrt();
            let wave = (dist * WAVE_FREQUENCY - phase).sin() * amplitude;
            let angle = dy.atan2(dx);
            (x as f32 + wave * angle.cos(), y as f32 + wave * angle.sin())
        });

        self.time += RIPPLE_PHASE_STEP;
        Ok(result)
    }
}
