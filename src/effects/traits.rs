//! Effect traits and invocation arguments
//!
//! This module defines the core trait for implementing effects:
//! - `Effect` - a frame-to-frame transform that may own state across calls
//! - `EffectCapabilities` - which auxiliary arguments an effect needs
//! - `EffectInput` - the auxiliary arguments injected by the engine

use thiserror::Error;

use crate::frame::Frame;

/// Errors an effect can raise while processing a frame
///
/// The engine treats any of these as a pass-through for that effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EffectError {
    #[error("previous frame is {prev_width}x{prev_height}, current frame is {width}x{height}")]
    PreviousFrameMismatch {
        width: u32,
        height: u32,
        prev_width: u32,
        prev_height: u32,
    },
    #[error("effect changed frame size from {expected_width}x{expected_height} to {width}x{height}")]
    SizeChanged {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
    #[error("{0}")]
    Failed(String),
}

/// Auxiliary arguments an effect declares it needs
///
/// Resolved once when an effect is loaded into the engine, so the
/// composition loop can dispatch without inspecting effect identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectCapabilities {
    /// Effect reads the previous frame from the engine's history
    pub needs_previous_frame: bool,
    /// Effect is centered on a focal point
    pub needs_focal_point: bool,
}

impl EffectCapabilities {
    /// Capabilities of a plain `frame -> frame` effect
    pub const NONE: Self = Self {
        needs_previous_frame: false,
        needs_focal_point: false,
    };

    /// Capabilities of a focal-point effect
    pub const FOCAL_POINT: Self = Self {
        needs_previous_frame: false,
        needs_focal_point: true,
    };

    /// Capabilities of a temporal effect
    pub const PREVIOUS_FRAME: Self = Self {
        needs_previous_frame: true,
        needs_focal_point: false,
    };
}

/// A point in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalPoint {
    pub x: f32,
    pub y: f32,
}

impl FocalPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Integer midpoint of the frame's width and height
    pub fn center_of(frame: &Frame) -> Self {
        Self {
            x: (frame.width() / 2) as f32,
            y: (frame.height() / 2) as f32,
        }
    }
}

/// Arguments the engine injects alongside the current frame
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectInput<'a> {
    /// Set only for effects declaring `needs_focal_point`
    pub focal_point: Option<FocalPoint>,
    /// Set only for effects declaring `needs_previous_frame`, and only once
    /// the engine's history holds more than one frame
    pub previous_frame: Option<&'a Frame>,
}

impl<'a> EffectInput<'a> {
    /// Input carrying no auxiliary arguments
    pub fn none() -> Self {
        Self::default()
    }

    /// Input carrying a focal point
    pub fn with_focal_point(focal_point: FocalPoint) -> Self {
        Self {
            focal_point: Some(focal_point),
            previous_frame: None,
        }
    }

    /// Input carrying a previous frame
    pub fn with_previous_frame(previous_frame: Option<&'a Frame>) -> Self {
        Self {
            focal_point: None,
            previous_frame,
        }
    }
}

/// A named frame-to-frame visual transform
///
/// Implementations may keep mutable state (phase counters, particle
/// columns) that advances on every call. That state lives as long as the
/// instance; recreating the instance resets it.
///
/// Every implementation must return a frame with the same dimensions as
/// its input.
pub trait Effect: Send {
    /// Unique identifier for this effect type (e.g., "liquify", "vhs")
    fn effect_type(&self) -> &'static str;

    /// Auxiliary arguments this effect needs
    fn capabilities(&self) -> EffectCapabilities {
        EffectCapabilities::NONE
    }

    /// Process one frame
    ///
    /// Bad input is reported through `Err`, which the engine logs before
    /// passing the frame on unchanged. Implementations must not panic: a
    /// panic unwinds out of the engine and ends the owning connection.
    fn apply(&mut self, frame: &Frame, input: &EffectInput<'_>) -> Result<Frame, EffectError>;
}
