//! Folio worker binary: runs the portfolio agent in a live LiveKit room.
//!
//! Usage: `folio-worker [room-name]`. The room falls back to `FOLIO_ROOM`,
//! then `portfolio-room`. Configuration is read from `FOLIO_CONFIG_PATH` or
//! `config.toml`.

use folio_server::{config, runtime};
use folio_voice::{
    entrypoint, prewarm, AzureRealtimeModel, JobContext, JobProcess, Room, VoiceService,
};
use std::sync::Arc;

const DEFAULT_ROOM: &str = "portfolio-room";

fn resolve_room_name(cli_arg: Option<String>, env_var: Option<String>) -> String {
    cli_arg
        .into_iter()
        .chain(env_var)
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ROOM.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();

    let (resolved_config_path, config_source) = config::resolve_config_path(None);
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)?;
    runtime::init_tracing(&config.logging);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        dotenv = dotenv.is_ok(),
        "resolved startup configuration path"
    );

    let room = resolve_room_name(std::env::args().nth(1), std::env::var("FOLIO_ROOM").ok());

    let process = Arc::new(JobProcess::new());
    prewarm(&process);

    let ctx = JobContext::new(
        Room::new(room),
        process,
        Arc::new(VoiceService::new(config.livekit.clone())),
    );
    let model = Arc::new(AzureRealtimeModel::new(config.realtime.clone()));

    let session = match entrypoint(&ctx, model).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(room = %ctx.room.name, "agent failed to start: {}", e);
            ctx.shutdown().await;
            return Err(e.into());
        }
    };

    tracing::info!(room = %ctx.room.name, "agent running");
    runtime::shutdown_signal().await;

    if let Err(e) = session.close().await {
        tracing::warn!(room = %ctx.room.name, "failed to close agent session: {}", e);
    }
    ctx.shutdown().await;

    tracing::info!("folio worker shut down");
    Ok(())
}
