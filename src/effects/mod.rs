//! Effects system for reality-glitcher
//!
//! This module provides gesture-driven effect composition:
//! - Stateful frame-to-frame effects with declared capabilities
//! - Sequential composition over a bounded frame history
//! - A persisted gesture → effect mapping with per-effect enablement
//!
//! # Architecture
//!
//! - **Traits** (`traits.rs`): the `Effect` trait, `EffectCapabilities` and
//!   the auxiliary `EffectInput` (focal point, previous frame)
//! - **Sampling** (`sampling.rs`): bilinear sampling and remapping shared by
//!   the displacement effects
//! - **Engine** (`engine.rs`): active list, frame history, composition loop
//! - **Registry** (`registry.rs`): gesture mapping, enablement, persistence
//! - **Builtin** (`builtin/`): ripple, liquify, pixel sort, VHS, matrix, ...
//!
//! # Usage
//!
//! ```ignore
//! let mut engine = EffectEngine::new();
//! builtin::load_builtin_effects(&mut engine, &EffectOptions::default());
//!
//! let registry = EffectRegistry::with_default_mappings();
//! engine.set_active(registry.resolve(&gestures));
//! let output = engine.process(&frame);
//! ```

mod engine;
mod registry;
mod traits;
pub mod builtin;
pub mod sampling;

pub use engine::*;
pub use registry::*;
pub use traits::*;
