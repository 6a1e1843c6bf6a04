use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("LiveKit API error: {0}")]
    LiveKit(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Room service error: {0}")]
    RoomService(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Realtime connection error: {0}")]
    Connection(String),

    #[error("Realtime protocol error: {0}")]
    Protocol(String),

    /// The provider reported an error event or a failed response.
    #[error("Realtime model error: {0}")]
    Provider(String),

    #[error("Realtime model did not respond within {0} seconds")]
    Timeout(u64),

    #[error("Agent session has not been started")]
    NotStarted,

    #[error("Agent session is closed")]
    Closed,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for VoiceError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        VoiceError::Connection(e.to_string())
    }
}

impl From<serde_json::Error> for VoiceError {
    fn from(e: serde_json::Error) -> Self {
        VoiceError::Protocol(e.to_string())
    }
}
