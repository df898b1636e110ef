//! Landmark detection
//!
//! Data model for face, hand and pose landmarks in normalized image
//! coordinates (0.0 - 1.0, origin top-left), plus the capability trait a
//! detection backend implements. Index conventions follow MediaPipe:
//! 468-point face mesh, 21-point hands, 33-point pose.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::Frame;

/// Number of points in a face mesh
pub const FACE_LANDMARK_COUNT: usize = 468;
/// Number of points per hand
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Face mesh landmark indices
pub mod face {
    /// Eye contour in EAR order: outer corner, two upper lid points, inner
    /// corner, two lower lid points
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];
    pub const MOUTH_LEFT_CORNER: usize = 61;
    pub const MOUTH_RIGHT_CORNER: usize = 291;
    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;
    pub const LEFT_EYEBROW: usize = 107;
    pub const RIGHT_EYEBROW: usize = 336;
    pub const LEFT_EYE_CORNER: usize = 33;
    pub const RIGHT_EYE_CORNER: usize = 362;
}

/// Hand landmark indices
pub mod hand {
    pub const WRIST: usize = 0;
    pub const MIDDLE_FINGER_TIP: usize = 12;
}

/// Pose landmark indices
pub mod pose {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
}

/// Errors raised by a detection backend
#[derive(Error, Debug)]
pub enum MlError {
    #[error("landmark detection unavailable: {0}")]
    Unavailable(String),
    #[error("landmark inference failed: {0}")]
    Inference(String),
}

/// A single landmark (normalized coordinates)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// 2-D Euclidean distance, ignoring depth
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Detected hand
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    /// 21 landmarks
    pub landmarks: [Landmark; HAND_LANDMARK_COUNT],
    /// Confidence score
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    /// Is right hand
    #[serde(default)]
    pub is_right: bool,
}

fn full_confidence() -> f32 {
    1.0
}

impl Default for Hand {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); HAND_LANDMARK_COUNT],
            confidence: 0.0,
            is_right: false,
        }
    }
}

impl Hand {
    /// Wrist sits above the middle fingertip by more than `margin`
    ///
    /// Image y grows downward, so "above" means a smaller y.
    pub fn is_raised(&self, margin: f32) -> bool {
        self.landmarks[hand::WRIST].y < self.landmarks[hand::MIDDLE_FINGER_TIP].y - margin
    }
}

/// Landmarks found in one frame
///
/// Absent parts are `None` / empty. Deserializable so clients running their
/// own detector can send landmarks alongside a frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkObservation {
    /// Face mesh points
    #[serde(default)]
    pub face: Option<Vec<Landmark>>,
    /// Detected hands (up to 2)
    #[serde(default)]
    pub hands: Vec<Hand>,
    /// Pose skeleton points
    #[serde(default)]
    pub pose: Option<Vec<Landmark>>,
}

impl LandmarkObservation {
    /// Face points, if a complete mesh was found
    pub fn face_mesh(&self) -> Option<&[Landmark]> {
        self.face
            .as_deref()
            .filter(|points| points.len() >= FACE_LANDMARK_COUNT)
    }

    /// Nose and both shoulders, if the pose skeleton covers them
    pub fn pose_anchors(&self) -> Option<(Landmark, Landmark, Landmark)> {
        let points = self.pose.as_deref()?;
        Some((
            *points.get(pose::NOSE)?,
            *points.get(pose::LEFT_SHOULDER)?,
            *points.get(pose::RIGHT_SHOULDER)?,
        ))
    }
}

/// A landmark detection backend
pub trait LandmarkDetector: Send {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Whether the backend can produce landmarks at all
    fn is_available(&self) -> bool {
        true
    }

    /// Find landmarks in a frame
    fn detect(&mut self, frame: &Frame) -> Result<LandmarkObservation, MlError>;
}

/// Backend used when no detector is available
///
/// Always reports that nothing was found.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDetector;

impl LandmarkDetector for DisabledDetector {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn detect(&mut self, _frame: &Frame) -> Result<LandmarkObservation, MlError> {
        Ok(LandmarkObservation::default())
    }
}

/// Create the server-side detection backend
///
/// No inference backend is bundled; frames without client-supplied
/// landmarks yield an empty observation.
pub fn create_detector() -> Box<dyn LandmarkDetector> {
    tracing::debug!("No server-side landmark backend, relying on client-supplied landmarks");
    Box::new(DisabledDetector)
}
