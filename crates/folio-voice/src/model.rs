//! The seam between the agent session and a realtime model provider.
//!
//! [`RealtimeModel`] opens connections; a [`RealtimeConnection`] is one
//! provider-side conversation. The Azure implementation lives in
//! [`crate::azure`]; tests plug in scripted models.

use crate::error::VoiceError;
use crate::metrics::RealtimeModelMetrics;
use async_trait::async_trait;
use folio_types::ChatItem;
use serde::Serialize;
use serde_json::Value;

/// The room a session is attached to.
///
/// Only the name is consumed: it tags logs and, for live rooms, selects the
/// LiveKit room to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub name: String,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// A room with no transport behind it, for text chat sessions.
    pub fn synthetic() -> Self {
        Self::new(format!("api-room-{}", uuid::Uuid::new_v4()))
    }
}

/// Provider-side noise suppression profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseCancellation {
    /// Background voice cancellation for close-talking microphones.
    Bvc,
    /// Tuned for telephony audio.
    BvcTelephony,
}

impl NoiseCancellation {
    /// The provider's `input_audio_noise_reduction.type` value.
    pub fn reduction_type(self) -> &'static str {
        match self {
            Self::Bvc => "near_field",
            Self::BvcTelephony => "far_field",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomInputOptions {
    pub noise_cancellation: Option<NoiseCancellation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOutputOptions {
    /// Produce spoken audio in addition to text.
    pub audio_enabled: bool,
    /// Transcribe the user's audio input.
    pub transcription_enabled: bool,
}

impl Default for RoomOutputOptions {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            transcription_enabled: false,
        }
    }
}

/// A function the model may call, in the provider's tool schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Everything a provider needs to open a conversation.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub instructions: String,
    pub room_name: String,
    pub input: RoomInputOptions,
    pub output: RoomOutputOptions,
    pub tools: Vec<ToolSpec>,
}

/// The items produced by one provider response, plus its metrics.
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    pub chat_items: Vec<ChatItem>,
    pub metrics: RealtimeModelMetrics,
}

impl ResponseOutcome {
    /// Function calls the model asked for in this response.
    pub fn function_calls(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.chat_items.iter().filter_map(|item| match item {
            ChatItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => Some((call_id.as_str(), name.as_str(), arguments.as_str())),
            _ => None,
        })
    }
}

/// A realtime model provider.
#[async_trait]
pub trait RealtimeModel: Send + Sync {
    /// Short label used in metrics and logs.
    fn label(&self) -> &str;

    /// Fails if the provider is not configured well enough to connect.
    fn validate(&self) -> Result<(), VoiceError>;

    async fn connect(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn RealtimeConnection>, VoiceError>;
}

/// One open conversation with a realtime model.
#[async_trait]
pub trait RealtimeConnection: Send {
    /// Adds `user_input` (if any) to the conversation and waits for the
    /// model's full response. `instructions` overrides the session prompt
    /// for this response only.
    async fn generate_reply(
        &mut self,
        user_input: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<ResponseOutcome, VoiceError>;

    /// Adds a tool result to the conversation without requesting a response.
    async fn add_tool_output(&mut self, call_id: &str, output: &str) -> Result<(), VoiceError>;

    async fn close(&mut self) -> Result<(), VoiceError>;
}
