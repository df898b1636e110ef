//! Reality Glitcher Library
//!
//! Gesture-driven real-time video effects. Frames streamed over a WebSocket
//! are analysed for facial and hand gestures; each gesture switches on a set
//! of effects that are composited over the frame, and the result is
//! broadcast to viewers and optionally written to a virtual camera.

pub mod api;
pub mod effects;
pub mod frame;
pub mod gestures;
pub mod ml;
pub mod network;
pub mod pipeline;
pub mod settings;
pub mod telemetry;

pub use effects::{Effect, EffectEngine, EffectRegistry};
pub use frame::Frame;
pub use gestures::{Gesture, GestureConfig, GestureDetector, GestureState};
pub use pipeline::{FrameOutcome, Pipeline, PipelineConfig};
pub use settings::AppSettings;
