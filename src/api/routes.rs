//! API route definitions

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::shared::AppContextHandle;
use super::types::*;
use super::websocket::ws_handler;
use crate::gestures::Gesture;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Create the API router with all endpoints
pub fn create_router(ctx: AppContextHandle) -> Router {
    Router::new()
        .route("/", get(info_handler))
        .route("/health", get(health_handler))
        // Frame ingestion and gesture events
        .route("/ws", get(ws_handler))
        // Status endpoints
        .route("/api/status", get(status_handler))
        // Effect enablement
        .route("/api/effects", get(list_effects))
        .route("/api/effects/:id/toggle", post(toggle_effect))
        // Gesture mappings
        .route("/api/mappings", get(list_mappings))
        .route("/api/mappings/:gesture", get(get_mapping).put(update_mapping))
        .with_state(ctx)
}

// ========== Service ==========

async fn info_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Reality Glitcher API",
        version: env!("CARGO_PKG_VERSION"),
        websocket: "/ws",
    })
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "reality-glitcher" }))
}

async fn status_handler(State(ctx): State<AppContextHandle>) -> Json<StatusResponse> {
    let (frames_processed, frames_undecodable, fps, frame_time) = {
        let profiler = ctx.profiler().lock();
        (
            profiler.total_frames(),
            profiler.undecodable_frames(),
            profiler.fps(),
            profiler.stats(),
        )
    };
    Json(StatusResponse {
        viewers: ctx.viewer_count(),
        frames_processed,
        frames_undecodable,
        fps,
        frame_time,
        virtual_camera_active: ctx.virtual_camera().is_active(),
    })
}

// ========== Effects ==========

async fn list_effects(State(ctx): State<AppContextHandle>) -> Json<EffectsResponse> {
    Json(EffectsResponse {
        effects: ctx.registry().read().enablement(),
    })
}

async fn toggle_effect(
    State(ctx): State<AppContextHandle>,
    Path(id): Path<String>,
) -> ApiResult<ToggleResponse> {
    let enabled = ctx.toggle_effect(&id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("unknown effect: {id}"))),
        )
    })?;
    Ok(Json(ToggleResponse { effect: id, enabled }))
}

// ========== Mappings ==========

async fn list_mappings(State(ctx): State<AppContextHandle>) -> Json<MappingsResponse> {
    let registry = ctx.registry().read();
    Json(MappingsResponse {
        gesture_mappings: registry
            .mappings()
            .iter()
            .map(|(gesture, effects)| (gesture.to_string(), effects.clone()))
            .collect(),
    })
}

fn parse_gesture(name: &str) -> Result<Gesture, (StatusCode, Json<ApiError>)> {
    Gesture::from_str(name)
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ApiError::not_found(e.to_string()))))
}

async fn get_mapping(
    State(ctx): State<AppContextHandle>,
    Path(gesture): Path<String>,
) -> ApiResult<Vec<String>> {
    let gesture = parse_gesture(&gesture)?;
    Ok(Json(ctx.registry().read().mapping(gesture).to_vec()))
}

async fn update_mapping(
    State(ctx): State<AppContextHandle>,
    Path(gesture): Path<String>,
    Json(req): Json<UpdateMappingRequest>,
) -> ApiResult<serde_json::Value> {
    let gesture = parse_gesture(&gesture)?;
    if req.effects.iter().any(|id| id.trim().is_empty()) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request("effect ids must not be empty")),
        ));
    }

    ctx.update_mapping(gesture, req.effects).map_err(|e| {
        tracing::error!(error = %e, "Failed to persist gesture mapping");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal(e.to_string())),
        )
    })?;

    Ok(Json(serde_json::json!({
        "message": "Mapping updated",
        "gesture": gesture.as_str(),
        "effects": ctx.registry().read().mapping(gesture),
    })))
}
