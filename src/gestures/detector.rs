//! Gesture detector - landmark geometry to gesture booleans
//!
//! Face gestures use the eye aspect ratio (EAR) and mouth/eyebrow
//! geometry of a MediaPipe face mesh; hand and head gestures use hand
//! and pose landmarks. Blink is debounced across frames; everything else
//! is evaluated per frame.

use serde::{Deserialize, Serialize};

use super::GestureState;
use crate::frame::{self, Frame};
use crate::ml::{face, DisabledDetector, Landmark, LandmarkDetector, LandmarkObservation};

/// Detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Average EAR below which the eyes count as closed
    pub blink_ear_threshold: f32,
    /// Consecutive closed frames before `blink` is reported
    pub blink_frames: u32,
    /// Mouth curvature ratio above which `smile` is reported
    pub smile_threshold: f32,
    /// Lip gap over mouth width above which `mouth_open` is reported
    pub mouth_open_threshold: f32,
    /// How far an eyebrow must sit above its eye corner
    pub eyebrow_margin: f32,
    /// How far the wrist must sit above the middle fingertip
    pub hand_raise_margin: f32,
    /// Horizontal nose offset from the shoulder midpoint for `head_tilt`
    pub head_tilt_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            blink_ear_threshold: 0.25,
            blink_frames: 3,
            smile_threshold: 0.5,
            mouth_open_threshold: 0.3,
            eyebrow_margin: 0.02,
            hand_raise_margin: 0.1,
            head_tilt_threshold: 0.15,
        }
    }
}

/// Eye aspect ratio of one eye
///
/// `(|p2 - p6| + |p3 - p5|) / (2 |p1 - p4|)`; 0.0 if the eye has no width.
pub fn eye_aspect_ratio(points: &[Landmark], eye: &[usize; 6]) -> f32 {
    let p = |i: usize| points[eye[i]];
    let vertical = p(1).distance(&p(5)) + p(2).distance(&p(4));
    let horizontal = p(0).distance(&p(3));
    if horizontal == 0.0 {
        return 0.0;
    }
    vertical / (2.0 * horizontal)
}

/// Corner-to-center distances over corner-to-corner distance
pub fn smile_ratio(points: &[Landmark]) -> f32 {
    let left = points[face::MOUTH_LEFT_CORNER];
    let right = points[face::MOUTH_RIGHT_CORNER];
    let center = points[face::UPPER_LIP];
    let width = left.distance(&right);
    if width == 0.0 {
        return 0.0;
    }
    (left.distance(&center) + right.distance(&center)) / width
}

/// Vertical lip gap over mouth width
pub fn mouth_open_ratio(points: &[Landmark]) -> f32 {
    let gap = (points[face::UPPER_LIP].y - points[face::LOWER_LIP].y).abs();
    let width = points[face::MOUTH_LEFT_CORNER].distance(&points[face::MOUTH_RIGHT_CORNER]);
    if width == 0.0 {
        return 0.0;
    }
    gap / width
}

/// Either eyebrow sits above its eye corner by more than `margin`
pub fn eyebrow_raised(points: &[Landmark], margin: f32) -> bool {
    let left = points[face::LEFT_EYEBROW].y < points[face::LEFT_EYE_CORNER].y - margin;
    let right = points[face::RIGHT_EYEBROW].y < points[face::RIGHT_EYE_CORNER].y - margin;
    left || right
}

/// Converts landmarks into a [`GestureState`] per frame
pub struct GestureDetector {
    config: GestureConfig,
    backend: Box<dyn LandmarkDetector>,
    /// Consecutive frames with the eyes closed
    blink_counter: u32,
}

impl GestureDetector {
    pub fn new(config: GestureConfig, backend: Box<dyn LandmarkDetector>) -> Self {
        tracing::debug!(backend = backend.name(), available = backend.is_available(), "Gesture detector created");
        Self {
            config,
            backend,
            blink_counter: 0,
        }
    }

    /// Detector that only evaluates landmarks supplied by the caller
    pub fn without_backend(config: GestureConfig) -> Self {
        Self::new(config, Box::new(DisabledDetector))
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn blink_counter(&self) -> u32 {
        self.blink_counter
    }

    /// Run the landmark backend on a frame and evaluate the result
    ///
    /// A backend failure yields all gestures false.
    pub fn detect(&mut self, frame: &Frame) -> GestureState {
        match self.backend.detect(frame) {
            Ok(observation) => self.evaluate(&observation),
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "Landmark detection failed");
                GestureState::none()
            }
        }
    }

    /// Decode a base64 frame payload and detect gestures in it
    ///
    /// An undecodable payload yields all gestures false and leaves the blink
    /// debounce untouched.
    pub fn detect_payload(&mut self, payload: &str) -> GestureState {
        match frame::decode_base64(payload) {
            Ok(decoded) => self.detect(&decoded),
            Err(e) => {
                tracing::debug!(error = %e, "Undecodable frame payload");
                GestureState::none()
            }
        }
    }

    /// Evaluate gestures from one frame's landmarks
    pub fn evaluate(&mut self, observation: &LandmarkObservation) -> GestureState {
        let mut state = GestureState::none();

        match observation.face_mesh() {
            Some(points) => self.evaluate_face(points, &mut state),
            None => self.blink_counter = 0,
        }

        let raised = observation
            .hands
            .iter()
            .filter(|hand| hand.is_raised(self.config.hand_raise_margin))
            .count();
        state.raise_hand = raised >= 1;
        state.both_hands_up = raised >= 2;

        if let Some((nose, left_shoulder, right_shoulder)) = observation.pose_anchors() {
            let mid_x = (left_shoulder.x + right_shoulder.x) / 2.0;
            state.head_tilt = (nose.x - mid_x).abs() > self.config.head_tilt_threshold;
        }

        state
    }

    fn evaluate_face(&mut self, points: &[Landmark], state: &mut GestureState) {
        let ear = (eye_aspect_ratio(points, &face::LEFT_EYE)
            + eye_aspect_ratio(points, &face::RIGHT_EYE))
            / 2.0;

        if ear < self.config.blink_ear_threshold {
            self.blink_counter = self.blink_counter.saturating_add(1);
            state.blink = self.blink_counter >= self.config.blink_frames;
        } else {
            self.blink_counter = 0;
        }

        state.smile = smile_ratio(points) > self.config.smile_threshold;
        state.mouth_open = mouth_open_ratio(points) > self.config.mouth_open_threshold;
        state.eyebrow_raise = eyebrow_raised(points, self.config.eyebrow_margin);

        tracing::trace!(ear, blink_counter = self.blink_counter, "Face gestures evaluated");
    }
}
