//! Slow Motion Effect
//!
//! Softens the current frame and blends in a ghost of the previous one.

use image::imageops;

use crate::effects::traits::{Effect, EffectCapabilities, EffectError, EffectInput};
use crate::frame::Frame;

/// Blur kernel size at intensity 1.0
const MAX_KERNEL: f32 = 15.0;
/// Weight of the previous frame at intensity 1.0
const MAX_GHOST_ALPHA: f32 = 0.3;

/// Slow motion runtime
pub struct SlowMotionEffect {
    intensity: f32,
}

impl SlowMotionEffect {
    pub fn new(intensity: f32) -> Self {
        Self {
            intensity: intensity.max(0.0),
        }
    }

    /// Odd kernel size derived from intensity
    fn kernel_size(&self) -> u32 {
        let k = (MAX_KERNEL * self.intensity) as u32;
        if k % 2 == 0 {
            k + 1
        } else {
            k
        }
    }
}

/// Gaussian sigma for a kernel size (same rule as OpenCV's automatic sigma)
fn sigma_for_kernel(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

impl Effect for SlowMotionEffect {
    fn effect_type(&self) -> &'static str {
        "slow_motion"
    }

    fn capabilities(&self) -> EffectCapabilities {
        EffectCapabilities::PREVIOUS_FRAME
    }

    fn apply(&mut self, frame: &Frame, input: &EffectInput<'_>) -> Result<Frame, EffectError> {
        let Some(previous) = input.previous_frame else {
            return Ok(frame.clone());
        };
        if previous.dimensions() != frame.dimensions() {
            return Err(EffectError::PreviousFrameMismatch {
                width: frame.width(),
                height: frame.height(),
                prev_width: previous.width(),
                prev_height: previous.height(),
            });
        }

        let kernel = self.kernel_size();
        let mut result = if kernel > 1 {
            imageops::blur(frame, sigma_for_kernel(kernel))
        } else {
            frame.clone()
        };

        let alpha = MAX_GHOST_ALPHA * self.intensity;
        for (out, prev) in result.pixels_mut().zip(previous.pixels()) {
            for c in 0..3 {
                let blended = out.0[c] as f32 * (1.0 - alpha) + prev.0[c] as f32 * alpha;
                out.0[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }

        Ok(result)
    }
}
