//! Realtime voice agent plumbing.
//!
//! Wraps an Azure OpenAI realtime deployment behind the [`RealtimeModel`]
//! seam, drives conversations through [`AgentSession`], and provides the
//! LiveKit room service and worker entry point used when the agent joins a
//! live room instead of serving text chat.

pub mod agent;
pub mod azure;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod protocol;
pub mod service;
pub mod session;
pub mod vad;
pub mod worker;

pub use agent::{contact_link_tool, Agent, FunctionTool, CONTACT_LINK_TOOL};
pub use azure::AzureRealtimeModel;
pub use config::{LiveKitConfig, RealtimeConfig, TurnDetection};
pub use error::VoiceError;
pub use metrics::{
    log_metrics, MetricsCollectedEvent, RealtimeModelMetrics, UsageCollector, UsageSummary,
};
pub use model::{
    NoiseCancellation, RealtimeConnection, RealtimeModel, ResponseOutcome, Room,
    RoomInputOptions, RoomOutputOptions, SessionOptions, ToolSpec,
};
pub use service::VoiceService;
pub use session::{AgentSession, ReplyHandle};
pub use vad::{VadSettings, VoiceActivityDetector};
pub use worker::{entrypoint, prewarm, JobContext, JobProcess};
