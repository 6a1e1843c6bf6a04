//! Worker entry point for agents joining a live LiveKit room.
//!
//! A worker process is prewarmed once via [`prewarm`], then runs one
//! [`entrypoint`] per job. Each job owns a [`JobContext`] whose shutdown
//! callbacks run when the job ends.

use crate::agent::Agent;
use crate::error::VoiceError;
use crate::metrics::{log_metrics, UsageCollector};
use crate::model::{NoiseCancellation, RealtimeModel, Room, RoomInputOptions, RoomOutputOptions};
use crate::service::VoiceService;
use crate::session::AgentSession;
use crate::vad::{VadSettings, VoiceActivityDetector};
use folio_types::persona;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{info, warn, Instrument};

/// Identity the agent joins rooms with.
pub const AGENT_IDENTITY: &str = "folio-agent";

type ShutdownCallback = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// State shared by every job a worker process runs.
#[derive(Debug, Default)]
pub struct JobProcess {
    vad: OnceLock<Arc<Mutex<VoiceActivityDetector>>>,
}

impl JobProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// The detector loaded by [`prewarm`], if it has run.
    pub fn vad(&self) -> Option<Arc<Mutex<VoiceActivityDetector>>> {
        self.vad.get().cloned()
    }
}

/// Loads the voice activity detector into `proc`. Later calls are no-ops.
pub fn prewarm(proc: &JobProcess) {
    proc.vad.get_or_init(|| {
        info!("prewarming voice activity detector");
        Arc::new(Mutex::new(VoiceActivityDetector::new(VadSettings::default())))
    });
}

/// One job: an agent attached to one room.
pub struct JobContext {
    pub room: Room,
    pub process: Arc<JobProcess>,
    voice_service: Arc<VoiceService>,
    shutdown_callbacks: Mutex<Vec<ShutdownCallback>>,
    join_token: OnceLock<String>,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("room", &self.room)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl JobContext {
    pub fn new(room: Room, process: Arc<JobProcess>, voice_service: Arc<VoiceService>) -> Self {
        Self {
            room,
            process,
            voice_service,
            shutdown_callbacks: Mutex::new(Vec::new()),
            join_token: OnceLock::new(),
        }
    }

    /// Registers `callback` to run when the job shuts down.
    pub fn add_shutdown_callback<F, Fut>(&self, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.shutdown_callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(move || callback().boxed()));
    }

    pub fn is_connected(&self) -> bool {
        self.join_token.get().is_some()
    }

    /// Token the agent participant joined with.
    pub fn join_token(&self) -> Option<&str> {
        self.join_token.get().map(String::as_str)
    }

    /// Makes sure the room exists and admits the agent to it.
    pub async fn connect(&self) -> Result<(), VoiceError> {
        if self.is_connected() {
            return Ok(());
        }
        if !self.voice_service.is_enabled() {
            return Err(VoiceError::Config(
                "LiveKit is not configured (LIVEKIT_URL)".to_string(),
            ));
        }

        self.voice_service.create_room(&self.room.name).await?;
        let token = self.voice_service.generate_join_token(
            &self.room.name,
            AGENT_IDENTITY,
            persona::AGENT_NAME,
        )?;
        let _ = self.join_token.set(token);

        info!(url = %self.voice_service.url(), "connected to room");
        Ok(())
    }

    /// Runs shutdown callbacks in registration order, then leaves the room.
    pub async fn shutdown(&self) {
        let callbacks = std::mem::take(
            &mut *self
                .shutdown_callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for callback in callbacks {
            callback().await;
        }

        if self.is_connected() {
            if let Err(e) = self
                .voice_service
                .remove_participant(&self.room.name, AGENT_IDENTITY)
                .await
            {
                warn!(room = %self.room.name, "failed to leave room: {}", e);
            }
        }
    }
}

/// Runs the portfolio agent in `ctx.room`.
///
/// The returned session stays live until the caller closes it.
pub async fn entrypoint(
    ctx: &JobContext,
    model: Arc<dyn RealtimeModel>,
) -> Result<Arc<AgentSession>, VoiceError> {
    let span = tracing::info_span!("job", room = %ctx.room.name);
    run(ctx, model).instrument(span).await
}

async fn run(
    ctx: &JobContext,
    model: Arc<dyn RealtimeModel>,
) -> Result<Arc<AgentSession>, VoiceError> {
    let session = Arc::new(AgentSession::new(model));

    let usage = Arc::new(UsageCollector::new());
    let collector = usage.clone();
    session.on_metrics_collected(move |ev| {
        log_metrics(&ev.metrics);
        collector.collect(&ev.metrics);
    });

    ctx.add_shutdown_callback(move || async move {
        info!("Usage: {}", usage.summary());
    });

    let agent = Agent::portfolio();
    let greeting = agent.greeting.clone();

    session
        .start(
            agent,
            &ctx.room,
            RoomInputOptions {
                noise_cancellation: Some(NoiseCancellation::Bvc),
            },
            RoomOutputOptions {
                audio_enabled: true,
                transcription_enabled: true,
            },
        )
        .await?;

    if let Err(e) = ctx.connect().await {
        if let Err(close_err) = session.close().await {
            warn!("failed to close session after connect error: {}", close_err);
        }
        return Err(e);
    }

    if let Some(line) = greeting {
        if let Err(e) = session.say(&line).await {
            if let Err(close_err) = session.close().await {
                warn!("failed to close session after greeting error: {}", close_err);
            }
            return Err(e);
        }
    }
    Ok(session)
}
