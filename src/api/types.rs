//! API request and response types
//!
//! These types are used for JSON serialization in the REST API and for the
//! messages exchanged over the `/ws` socket.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gestures::GestureState;
use crate::ml::LandmarkObservation;
use crate::telemetry::FrameStats;

// ========== WebSocket: inbound ==========

/// Message sent by a client over the WebSocket
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// An encoded frame (base64 JPEG/PNG, optionally a data URL)
    Frame {
        data: String,
        /// Echoed back verbatim in the resulting gesture event
        #[serde(default)]
        timestamp: serde_json::Value,
        /// Landmarks from a client-side detector
        #[serde(default)]
        landmarks: Option<LandmarkObservation>,
    },
    /// A control command
    Control {
        control: ControlCommand,
        #[serde(default)]
        effect: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    Start,
    Stop,
    ToggleEffect,
}

// ========== WebSocket: outbound ==========

/// Event broadcast to every connected viewer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// Result of processing one frame
    GestureEvent {
        gestures: GestureState,
        active_effects: Vec<String>,
        timestamp: serde_json::Value,
        /// Composited frame as base64 JPEG, when frame broadcast is on
        #[serde(skip_serializing_if = "Option::is_none")]
        frame: Option<String>,
    },
    /// An effect was enabled or disabled
    EffectToggled { effect: String, enabled: bool },
}

// ========== REST ==========

/// Service info returned by `GET /`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub websocket: &'static str,
}

/// Response for `GET /api/status`
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Connected WebSocket clients
    pub viewers: usize,
    /// Frames composited since startup
    pub frames_processed: u64,
    /// Payloads that could not be decoded
    pub frames_undecodable: u64,
    /// Frames per second over the metrics window
    pub fps: f64,
    pub frame_time: FrameStats,
    pub virtual_camera_active: bool,
}

/// Response for `GET /api/effects`
#[derive(Debug, Clone, Serialize)]
pub struct EffectsResponse {
    /// Enabled flag per effect identifier
    pub effects: BTreeMap<String, bool>,
}

/// Response for `POST /api/effects/:id/toggle`
#[derive(Debug, Clone, Serialize)]
pub struct ToggleResponse {
    pub effect: String,
    pub enabled: bool,
}

/// Response for `GET /api/mappings`, same shape as the stored document
#[derive(Debug, Clone, Serialize)]
pub struct MappingsResponse {
    pub gesture_mappings: BTreeMap<String, Vec<String>>,
}

/// Body of `PUT /api/mappings/:gesture`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMappingRequest {
    pub effects: Vec<String>,
}

/// Error body returned by failing endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            error: "Not Found".to_string(),
            message: message.into(),
            code: 404,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: "Bad Request".to_string(),
            message: message.into(),
            code: 400,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: "Internal Server Error".to_string(),
            message: message.into(),
            code: 500,
        }
    }
}
