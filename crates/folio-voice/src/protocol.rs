//! Realtime API wire events.
//!
//! Only the events this crate sends or acts upon are modelled; every other
//! server event deserializes to [`ServerEvent::Other`].

use crate::config::TurnDetection;
use crate::error::VoiceError;
use crate::metrics::RealtimeModelMetrics;
use crate::model::ToolSpec;
use folio_types::{ChatItem, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionSettings },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ClientItem },
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseParams>,
    },
}

impl ClientEvent {
    pub fn to_json(&self) -> Result<String, VoiceError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSettings {
    pub instructions: String,
    pub modalities: Vec<&'static str>,
    pub voice: String,
    pub turn_detection: TurnDetection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_noise_reduction: Option<NoiseReductionSettings>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionSettings {
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoiseReductionSettings {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientItem {
    Message {
        role: Role,
        content: Vec<InputContent>,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

impl ClientItem {
    pub fn user_text(text: &str) -> Self {
        Self::Message {
            role: Role::User,
            content: vec![InputContent::InputText {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContent {
    InputText { text: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated {},
    #[serde(rename = "session.updated")]
    SessionUpdated {},
    #[serde(rename = "error")]
    Error { error: ProviderError },
    #[serde(rename = "response.created")]
    ResponseCreated {},
    #[serde(rename = "response.text.delta")]
    TextDelta {},
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {},
    #[serde(rename = "response.audio.delta")]
    AudioDelta {},
    #[serde(rename = "response.done")]
    ResponseDone { response: ResponseResource },
    #[serde(other)]
    Other,
}

impl ServerEvent {
    pub fn parse(text: &str) -> Result<Self, VoiceError> {
        Ok(serde_json::from_str(text)?)
    }

    /// True for the first streamed output of a response.
    pub fn is_output_delta(&self) -> bool {
        matches!(
            self,
            Self::TextDelta {} | Self::AudioTranscriptDelta {} | Self::AudioDelta {}
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseResource {
    #[serde(default)]
    pub id: String,
    /// `completed`, `cancelled`, `failed` or `incomplete`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_details: Option<Value>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ResponseResource {
    pub fn chat_items(&self) -> Vec<ChatItem> {
        self.output.iter().filter_map(OutputItem::to_chat_item).collect()
    }

    /// Copies status and token usage into `metrics`.
    pub fn apply_to(&self, metrics: &mut RealtimeModelMetrics) {
        if !self.id.is_empty() {
            metrics.request_id = self.id.clone();
        }
        metrics.cancelled = self.status == "cancelled";
        if let Some(usage) = &self.usage {
            metrics.input_tokens = usage.input_tokens;
            metrics.output_tokens = usage.output_tokens;
            metrics.total_tokens = usage.total_tokens;
            metrics.input_cached_tokens = usage.input_token_details.cached_tokens;
            metrics.input_text_tokens = usage.input_token_details.text_tokens;
            metrics.input_audio_tokens = usage.input_token_details.audio_tokens;
            metrics.output_text_tokens = usage.output_token_details.text_tokens;
            metrics.output_audio_tokens = usage.output_token_details.audio_tokens;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default)]
        id: String,
        role: Role,
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(other)]
    Other,
}

impl OutputItem {
    fn to_chat_item(&self) -> Option<ChatItem> {
        match self {
            Self::Message { id, role, content } => {
                let parts: Vec<&str> = content.iter().filter_map(ContentPart::text).collect();
                let text_content = if parts.is_empty() {
                    None
                } else {
                    Some(parts.concat())
                };
                Some(ChatItem::Message {
                    id: id.clone(),
                    role: *role,
                    text_content,
                })
            }
            Self::FunctionCall {
                call_id,
                name,
                arguments,
            } => Some(ChatItem::FunctionCall {
                call_id: call_id.clone(),
                name: name.clone(),
                arguments: arguments.clone(),
            }),
            Self::Other => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Audio {
        #[serde(default)]
        transcript: Option<String>,
    },
    InputText {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl ContentPart {
    fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::InputText { text } => Some(text.as_str()),
            Self::Audio { transcript } => transcript.as_deref(),
            Self::Other => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_token_details: InputTokenDetails,
    pub output_token_details: OutputTokenDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InputTokenDetails {
    pub cached_tokens: u64,
    pub text_tokens: u64,
    pub audio_tokens: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputTokenDetails {
    pub text_tokens: u64,
    pub audio_tokens: u64,
}
