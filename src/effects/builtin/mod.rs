//! Built-in effects
//!
//! This module contains the standard effects that ship with reality-glitcher.

mod corruption;
mod gravity;
mod liquify;
mod matrix;
mod pixel_sort;
mod ripple;
mod slow_motion;
mod vhs;

pub use corruption::BlockCorruptionEffect;
pub use gravity::GravityFlipEffect;
pub use liquify::{LiquifyEffect, DEFAULT_LIQUIFY_RADIUS};
pub use matrix::MatrixRainEffect;
pub use pixel_sort::{PixelSortEffect, SortOrientation};
pub use ripple::{RippleEffect, RIPPLE_PHASE_STEP};
pub use slow_motion::SlowMotionEffect;
pub use vhs::{VhsEffect, SCANLINE_STEP};

use super::engine::EffectEngine;
use super::traits::Effect;

/// Identifiers of every built-in effect, in load order
pub const BUILTIN_EFFECTS: &[&str] = &[
    "portal_ripple",
    "liquify",
    "flipGravity",
    "pixel_sort",
    "data_corruption",
    "vhs",
    "matrix",
    "slow_motion",
];

/// Construction parameters shared by the built-in effects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectOptions {
    /// Strength in `[0, 1]`
    pub intensity: f32,
    /// Direction used by `pixel_sort`
    pub pixel_sort_orientation: SortOrientation,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            intensity: 0.5,
            pixel_sort_orientation: SortOrientation::Horizontal,
        }
    }
}

/// Create a fresh instance of a built-in effect
///
/// Returns `None` for identifiers that are not built in.
pub fn create_effect(effect_type: &str, options: &EffectOptions) -> Option<Box<dyn Effect>> {
    let intensity = options.intensity.clamp(0.0, 1.0);
    let effect: Box<dyn Effect> = match effect_type {
        "portal_ripple" => Box::new(RippleEffect::new(intensity)),
        "liquify" => Box::new(LiquifyEffect::new(intensity)),
        "flipGravity" => Box::new(GravityFlipEffect::new(intensity)),
        "pixel_sort" => Box::new(PixelSortEffect::new(
            intensity,
            options.pixel_sort_orientation,
        )),
        "data_corruption" => Box::new(BlockCorruptionEffect::new(intensity)),
        "vhs" => Box::new(VhsEffect::new(intensity)),
        "matrix" => Box::new(MatrixRainEffect::new(intensity)),
        "slow_motion" => Box::new(SlowMotionEffect::new(intensity)),
        _ => return None,
    };
    Some(effect)
}

/// Load every built-in effect into an engine
pub fn load_builtin_effects(engine: &mut EffectEngine, options: &EffectOptions) {
    for effect_type in BUILTIN_EFFECTS {
        if let Some(effect) = create_effect(effect_type, options) {
            engine.load_effect(effect_type, effect);
        }
    }
}
