//! API handlers for the chat façade.

use crate::session::VoiceAgentSession;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Response body for `POST /session/start`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
}

/// Request body for `POST /session/{id}/chat`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response body for `POST /session/{id}/chat`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// API error type mapping to HTTP status codes.
///
/// Bodies take the form `{"detail": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unprocessable request: {0}")]
    UnprocessableEntity(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "detail": message
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(rejection.body_text()),
            _ => ApiError::UnprocessableEntity(rejection.body_text()),
        }
    }
}

/// Handler for `POST /session/start`.
pub async fn start_session_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let session = VoiceAgentSession::new(state.model.clone()).map_err(|e| {
        tracing::error!("Error starting session: {}", e);
        ApiError::InternalServerError(format!("Failed to start session: {}", e))
    })?;

    let room = session.room_name().to_string();
    let session_id = state.sessions.insert(session);
    tracing::info!(session_id = %session_id, room = %room, "Started new session");

    Ok(Json(StartSessionResponse { session_id }))
}

/// Handler for `POST /session/{id}/chat`.
pub async fn chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;

    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    tracing::info!(session_id = %session_id, "Processing chat message");

    let response = session.send_message(&request.message).await.map_err(|e| {
        tracing::error!(session_id = %session_id, "Error processing chat message: {}", e);
        ApiError::InternalServerError(format!("Failed to process message: {}", e))
    })?;

    Ok(Json(ChatResponse { response }))
}

/// Handler for `POST /session/{id}/end`.
///
/// Unknown ids are not an error; the call always reports `ended`.
pub async fn end_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if let Some(session) = state.sessions.remove(&session_id) {
        session.close().await.map_err(|e| {
            tracing::error!(session_id = %session_id, "Error ending session: {}", e);
            ApiError::InternalServerError(format!("Failed to end session: {}", e))
        })?;
        tracing::info!(session_id = %session_id, "Ended session");
    }

    Ok(Json(json!({ "status": "ended" })))
}

/// Handler for `GET /`.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Voice Assistant API is running",
        "status": "healthy"
    }))
}

/// Handler for `GET /health`.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "voice-assistant-api"
    }))
}
