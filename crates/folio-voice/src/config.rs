use crate::error::VoiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

fn default_token_ttl_seconds() -> u64 {
    3600
}

fn default_deployment() -> String {
    "gpt-4o-realtime-preview".to_string()
}

fn default_api_version() -> String {
    "2024-10-01-preview".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_response_timeout_secs() -> u64 {
    60
}

/// Server-side turn detection parameters sent to the realtime model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    /// Voice activity threshold in `0.0..=1.0`.
    pub threshold: f32,
    /// Audio kept before detected speech, in milliseconds.
    pub prefix_padding_ms: u32,
    /// Silence that ends a user turn, in milliseconds.
    pub silence_duration_ms: u32,
    /// Generate a response automatically when a turn ends.
    pub create_response: bool,
    /// Let the user interrupt an in-progress response.
    pub interrupt_response: bool,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            kind: "server_vad".to_string(),
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
            create_response: true,
            interrupt_response: true,
        }
    }
}

/// Connection settings for an Azure OpenAI realtime deployment.
#[derive(Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_deployment")]
    pub deployment: String,
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    /// Upper bound on any single wait for the provider. Default: 60.
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
    #[serde(default)]
    pub turn_detection: TurnDetection,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            deployment: default_deployment(),
            endpoint: String::new(),
            api_key: String::new(),
            api_version: default_api_version(),
            voice: default_voice(),
            transcription_model: default_transcription_model(),
            response_timeout_secs: default_response_timeout_secs(),
            turn_detection: TurnDetection::default(),
        }
    }
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("deployment", &self.deployment)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("voice", &self.voice)
            .field("transcription_model", &self.transcription_model)
            .field("response_timeout_secs", &self.response_timeout_secs)
            .field("turn_detection", &self.turn_detection)
            .finish()
    }
}

impl RealtimeConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// Checks that the settings are usable before any connection is attempted.
    pub fn validate(&self) -> Result<(), VoiceError> {
        if self.endpoint.trim().is_empty() {
            return Err(VoiceError::Config(
                "realtime endpoint is not set (AZURE_OPENAI_REALTIME_ENDPOINT)".to_string(),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(VoiceError::Config(
                "realtime API key is not set (AZURE_OPENAI_REALTIME_API_KEY)".to_string(),
            ));
        }
        if self.deployment.trim().is_empty() {
            return Err(VoiceError::Config("realtime deployment is empty".to_string()));
        }
        let parsed = url::Url::parse(&self.endpoint)
            .map_err(|e| VoiceError::Config(format!("invalid realtime endpoint: {}", e)))?;
        match parsed.scheme() {
            "https" | "http" | "wss" | "ws" => Ok(()),
            other => Err(VoiceError::Config(format!(
                "unsupported realtime endpoint scheme: {}",
                other
            ))),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing)]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}
