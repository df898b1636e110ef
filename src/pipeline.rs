//! Per-client frame pipeline
//!
//! One pipeline serves one connection: decode → detect gestures → resolve
//! effects → compose → sink. It owns its detector (blink debounce), its
//! engine (frame history) and its effect instances, so nothing here is
//! shared between connections except the registry and the virtual camera.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::effects::builtin::{load_builtin_effects, EffectOptions};
use crate::effects::{EffectEngine, EffectRegistry};
use crate::frame::{self, Frame, FrameError};
use crate::gestures::{GestureConfig, GestureDetector, GestureState};
use crate::ml::{LandmarkDetector, LandmarkObservation};
use crate::network::VirtualCamera;
use crate::settings::AppSettings;

/// Construction parameters for a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub gestures: GestureConfig,
    pub history_capacity: usize,
    pub effects: EffectOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppSettings::default())
    }
}

impl From<&AppSettings> for PipelineConfig {
    fn from(settings: &AppSettings) -> Self {
        Self {
            gestures: settings.gestures.clone(),
            history_capacity: settings.history_capacity,
            effects: settings.effect_options(),
        }
    }
}

/// Result of processing one inbound frame
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// Gesture snapshot for this frame
    pub gestures: GestureState,
    /// Effects composed over this frame, in order
    pub active_effects: Vec<String>,
    /// Composited frame; `None` if the payload could not be decoded
    pub frame: Option<Frame>,
    /// Time spent in detection and composition
    pub elapsed: Duration,
}

impl FrameOutcome {
    fn undecodable(started: Instant) -> Self {
        Self {
            gestures: GestureState::none(),
            active_effects: Vec::new(),
            frame: None,
            elapsed: started.elapsed(),
        }
    }
}

/// Detection and composition state for one client
pub struct Pipeline {
    detector: GestureDetector,
    engine: EffectEngine,
    registry: Arc<RwLock<EffectRegistry>>,
    virtual_camera: Option<Arc<VirtualCamera>>,
}

impl Pipeline {
    /// Create a pipeline with every built-in effect loaded
    pub fn new(
        config: &PipelineConfig,
        registry: Arc<RwLock<EffectRegistry>>,
        backend: Box<dyn LandmarkDetector>,
    ) -> Self {
        let mut engine = EffectEngine::with_history_capacity(config.history_capacity);
        load_builtin_effects(&mut engine, &config.effects);

        Self {
            detector: GestureDetector::new(config.gestures.clone(), backend),
            engine,
            registry,
            virtual_camera: None,
        }
    }

    /// Forward every composited frame to a virtual camera
    pub fn with_virtual_camera(mut self, camera: Arc<VirtualCamera>) -> Self {
        self.virtual_camera = Some(camera);
        self
    }

    pub fn engine(&self) -> &EffectEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut EffectEngine {
        &mut self.engine
    }

    /// Process a base64 / data-URL encoded frame
    pub fn process_payload(
        &mut self,
        payload: &str,
        landmarks: Option<&LandmarkObservation>,
    ) -> FrameOutcome {
        let started = Instant::now();
        self.process_decoded(frame::decode_base64(payload), landmarks, started)
    }

    /// Process a raw encoded frame (JPEG/PNG bytes)
    pub fn process_bytes(
        &mut self,
        bytes: &[u8],
        landmarks: Option<&LandmarkObservation>,
    ) -> FrameOutcome {
        let started = Instant::now();
        self.process_decoded(frame::decode_bytes(bytes), landmarks, started)
    }

    fn process_decoded(
        &mut self,
        decoded: Result<Frame, FrameError>,
        landmarks: Option<&LandmarkObservation>,
        started: Instant,
    ) -> FrameOutcome {
        match decoded {
            Ok(frame) => self.process_frame_at(&frame, landmarks, started),
            Err(e) => {
                tracing::debug!(error = %e, "Dropping undecodable frame");
                FrameOutcome::undecodable(started)
            }
        }
    }

    /// Detect, resolve and compose one decoded frame
    ///
    /// Client-supplied landmarks take precedence over the detection backend.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        landmarks: Option<&LandmarkObservation>,
    ) -> FrameOutcome {
        self.process_frame_at(frame, landmarks, Instant::now())
    }

    fn process_frame_at(
        &mut self,
        frame: &Frame,
        landmarks: Option<&LandmarkObservation>,
        started: Instant,
    ) -> FrameOutcome {
        let gestures = match landmarks {
            Some(observation) => self.detector.evaluate(observation),
            None => self.detector.detect(frame),
        };

        let active_effects = self.registry.read().resolve(&gestures);
        self.engine.set_active(&active_effects);
        let output = self.engine.process(frame);

        if let Some(camera) = &self.virtual_camera {
            camera.send_frame(&output);
        }

        tracing::trace!(
            width = frame.width(),
            height = frame.height(),
            effects = ?active_effects,
            "Frame composed"
        );

        FrameOutcome {
            gestures,
            active_effects,
            frame: Some(output),
            elapsed: started.elapsed(),
        }
    }
}
