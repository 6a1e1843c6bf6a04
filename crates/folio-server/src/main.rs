//! Folio server binary: the HTTP chat façade.
//!
//! Starts an axum HTTP server with structured logging and graceful shutdown
//! on SIGTERM/SIGINT. Live sessions are closed before the process exits.

use folio_server::{app, config, runtime, AppState};
use folio_voice::AzureRealtimeModel;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();

    let (resolved_config_path, config_source) =
        config::resolve_config_path(std::env::args().nth(1));
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)?;
    runtime::init_tracing(&config.logging);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        dotenv = dotenv.is_ok(),
        "resolved startup configuration path"
    );

    if let Err(e) = config.realtime.validate() {
        tracing::warn!("realtime model is not usable, sessions will fail to start: {}", e);
    }

    let model = Arc::new(AzureRealtimeModel::new(config.realtime.clone()));
    let state = AppState::new(model);
    let sessions = state.sessions.clone();

    let addr = SocketAddr::new(config.server.host, config.server.port);
    tracing::info!(%addr, "starting folio server");

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app(state))
        .with_graceful_shutdown(runtime::shutdown_signal())
        .await?;

    for (id, session) in sessions.drain() {
        if let Err(e) = session.close().await {
            tracing::warn!(session_id = %id, "failed to close session on shutdown: {}", e);
        }
    }

    tracing::info!("folio server shut down");
    Ok(())
}
