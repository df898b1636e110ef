//! WebSocket handler for frame ingestion and gesture event streaming
//!
//! Provides a WebSocket endpoint at `/ws`. Each connection streams encoded
//! frames in and receives every viewer's gesture events out. Frames from one
//! connection are processed in order by that connection's own `Pipeline`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use super::shared::{AppContext, AppContextHandle};
use super::types::{ClientMessage, ControlCommand, WsEvent};
use crate::frame;
use crate::ml::LandmarkObservation;
use crate::pipeline::{FrameOutcome, Pipeline};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<AppContextHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

/// Encoded frame as received from the client
enum FramePayload {
    /// Base64 or data URL from a `frame` message
    Encoded(String),
    /// Raw JPEG/PNG bytes from a binary message
    Raw(Vec<u8>),
}

/// A processed frame ready to broadcast
struct ProcessedFrame {
    pipeline: Pipeline,
    outcome: FrameOutcome,
    encoded: Option<String>,
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, ctx: AppContextHandle) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the first frame so this viewer sees its own events
    let mut rx = ctx.subscribe();

    let viewers = ctx.viewer_connected();
    tracing::info!(viewers, "WebSocket client connected");

    let recv_ctx = ctx.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut pipeline = recv_ctx.new_pipeline();

        while let Some(msg) = receiver.next().await {
            let (payload, timestamp, landmarks) = match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Frame {
                        data,
                        timestamp,
                        landmarks,
                    }) => {
                        if data.is_empty() {
                            continue;
                        }
                        (FramePayload::Encoded(data), timestamp, landmarks)
                    }
                    Ok(ClientMessage::Control { control, effect }) => {
                        handle_control(&recv_ctx, control, effect.as_deref());
                        continue;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Ignoring malformed WebSocket message");
                        continue;
                    }
                },
                Ok(Message::Binary(bytes)) => (
                    FramePayload::Raw(bytes),
                    serde_json::Value::Null,
                    None,
                ),
                Ok(Message::Close(_)) => {
                    tracing::info!("WebSocket client requested close");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
                // Pong is handled automatically by axum
                _ => continue,
            };

            let Some(processed) = process_frame(&recv_ctx, pipeline, payload, landmarks).await
            else {
                break;
            };
            pipeline = processed.pipeline;

            {
                let mut profiler = recv_ctx.profiler().lock();
                match processed.outcome.frame {
                    Some(_) => profiler.record(processed.outcome.elapsed),
                    None => profiler.record_undecodable(),
                }
            }

            recv_ctx.broadcast(WsEvent::GestureEvent {
                gestures: processed.outcome.gestures,
                active_effects: processed.outcome.active_effects,
                timestamp,
                frame: processed.encoded,
            });
        }
    });

    // Forward broadcast events to this viewer
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break; // Client disconnected
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to serialize event"),
                },
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "WebSocket client lagged, skipped events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Either side finishing ends the connection
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    let viewers = ctx.viewer_disconnected();
    tracing::info!(viewers, "WebSocket client disconnected");
}

/// Run one frame through the pipeline on the blocking pool
///
/// Waits for a worker permit first. Returns `None` if the processing task
/// panicked, which takes the pipeline down with it.
async fn process_frame(
    ctx: &AppContext,
    mut pipeline: Pipeline,
    payload: FramePayload,
    landmarks: Option<LandmarkObservation>,
) -> Option<ProcessedFrame> {
    let permit = ctx.workers().acquire_owned().await.ok()?;
    let broadcast_frames = ctx.settings().broadcast_frames;
    let jpeg_quality = ctx.settings().jpeg_quality;

    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let outcome = match &payload {
            FramePayload::Encoded(data) => pipeline.process_payload(data, landmarks.as_ref()),
            FramePayload::Raw(bytes) => pipeline.process_bytes(bytes, landmarks.as_ref()),
        };

        let encoded = match (&outcome.frame, broadcast_frames) {
            (Some(output), true) => match frame::encode_jpeg_base64(output, jpeg_quality) {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode composited frame");
                    None
                }
            },
            _ => None,
        };

        ProcessedFrame {
            pipeline,
            outcome,
            encoded,
        }
    })
    .await;

    match result {
        Ok(processed) => Some(processed),
        Err(e) => {
            tracing::error!(error = %e, "Frame processing task failed");
            None
        }
    }
}

/// Apply a control command from a client
fn handle_control(ctx: &AppContext, control: ControlCommand, effect: Option<&str>) {
    match control {
        ControlCommand::Start => tracing::info!("Client requested start"),
        ControlCommand::Stop => tracing::info!("Client requested stop"),
        ControlCommand::ToggleEffect => match effect {
            // Unknown ids are logged and dropped by the context
            Some(effect_id) => {
                let _ = ctx.toggle_effect(effect_id);
            }
            None => tracing::warn!("toggle_effect without an effect id"),
        },
    }
}
