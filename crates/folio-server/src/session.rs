//! Text-chat wrapper around an [`AgentSession`].

use folio_voice::{
    log_metrics, Agent, AgentSession, NoiseCancellation, RealtimeModel, Room, RoomInputOptions,
    RoomOutputOptions, UsageCollector, UsageSummary, VoiceError,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Returned to the client when a reply carries no assistant message.
pub const NO_RESPONSE: &str = "[No response]";

#[derive(Debug, Error)]
pub enum SessionError {
    /// The realtime model is not usable; no session was created.
    #[error("{0}")]
    Config(VoiceError),

    #[error("{0}")]
    Model(#[from] VoiceError),
}

/// One chat conversation with the portfolio agent.
///
/// The session is attached to a synthetic room and connects to the model
/// lazily, on the first message.
#[derive(Debug)]
pub struct VoiceAgentSession {
    session: AgentSession,
    agent: Agent,
    room: Room,
    usage: Arc<UsageCollector>,
}

impl VoiceAgentSession {
    /// Builds a session without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the model configuration is unusable.
    pub fn new(model: Arc<dyn RealtimeModel>) -> Result<Self, SessionError> {
        model.validate().map_err(SessionError::Config)?;

        let session = AgentSession::new(model);
        let usage = Arc::new(UsageCollector::new());
        let collector = usage.clone();
        session.on_metrics_collected(move |ev| {
            log_metrics(&ev.metrics);
            collector.collect(&ev.metrics);
        });

        Ok(Self {
            session,
            agent: Agent::portfolio(),
            room: Room::synthetic(),
            usage,
        })
    }

    pub fn room_name(&self) -> &str {
        &self.room.name
    }

    /// Connects to the model. Repeated calls are no-ops.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.session
            .start(
                self.agent.clone(),
                &self.room,
                RoomInputOptions {
                    noise_cancellation: Some(NoiseCancellation::Bvc),
                },
                RoomOutputOptions {
                    audio_enabled: true,
                    transcription_enabled: true,
                },
            )
            .await?;
        Ok(())
    }

    /// Sends `message` and returns the text of the last assistant message.
    ///
    /// Yields [`NO_RESPONSE`] when the reply has no assistant message and an
    /// empty string when that message has no text.
    pub async fn send_message(&self, message: &str) -> Result<String, SessionError> {
        self.start().await?;
        let reply = self.session.generate_reply(message).await?;

        Ok(match reply.last_assistant_message() {
            Some(message) => message.text().unwrap_or_default().to_string(),
            None => NO_RESPONSE.to_string(),
        })
    }

    /// Releases the model connection.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.session.close().await?;
        info!(room = %self.room.name, "Usage: {}", self.usage.summary());
        Ok(())
    }

    pub fn usage(&self) -> UsageSummary {
        self.usage.summary()
    }
}
