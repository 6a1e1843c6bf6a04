//! HTTP façade and binaries for the portfolio voice agent.

pub mod api;
pub mod config;
pub mod registry;
pub mod runtime;
pub mod session;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use folio_voice::RealtimeModel;
use registry::SessionRegistry;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use session::{SessionError, VoiceAgentSession, NO_RESPONSE};

/// Maximum request body size (64 KiB). Chat messages are short text.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live chat sessions.
    pub sessions: SessionRegistry,
    /// Model every new session connects to.
    pub model: Arc<dyn RealtimeModel>,
}

impl AppState {
    pub fn new(model: Arc<dyn RealtimeModel>) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            model,
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::root_handler))
        .route("/health", get(api::health_handler))
        .route("/session/start", post(api::start_session_handler))
        .route("/session/{session_id}/chat", post(api::chat_handler))
        .route("/session/{session_id}/end", post(api::end_session_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
