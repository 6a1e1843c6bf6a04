//! Server configuration loading from file and environment variables.

use folio_voice::{LiveKitConfig, RealtimeConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level configuration shared by both binaries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Azure OpenAI realtime deployment.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// LiveKit server used by the room worker.
    #[serde(default)]
    pub livekit: LiveKitConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "folio_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Picks the config file path: `cli_arg` first, then `FOLIO_CONFIG_PATH`.
///
/// Returns the path (if any) and where it came from, for the startup log.
pub fn resolve_config_path(cli_arg: Option<String>) -> (Option<String>, &'static str) {
    if let Some(path) = cli_arg.filter(|value| !value.trim().is_empty()) {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("FOLIO_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides.
///
/// Environment variable overrides:
/// - `FOLIO_HOST` overrides `server.host`
/// - `FOLIO_PORT` (or `PORT`) overrides `server.port`
/// - `FOLIO_LOG_LEVEL` overrides `logging.level`
/// - `FOLIO_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `AZURE_OPENAI_REALTIME_ENDPOINT`, `AZURE_OPENAI_REALTIME_API_KEY`,
///   `AZURE_OPENAI_REALTIME_API_VERSION` and `AZURE_OPENAI_REALTIME_DEPLOYMENT`
///   override the matching `realtime` fields
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY` and `LIVEKIT_API_SECRET` override the
///   matching `livekit` fields
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides read through `var`. Unparseable values are ignored.
pub fn apply_overrides<F>(config: &mut Config, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = var("FOLIO_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("FOLIO_PORT").or_else(|| var("PORT")) {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = var("FOLIO_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("FOLIO_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    let realtime = &mut config.realtime;
    if let Some(endpoint) = var("AZURE_OPENAI_REALTIME_ENDPOINT") {
        realtime.endpoint = endpoint;
    }
    if let Some(key) = var("AZURE_OPENAI_REALTIME_API_KEY") {
        realtime.api_key = key;
    }
    if let Some(version) = var("AZURE_OPENAI_REALTIME_API_VERSION").filter(|v| !v.is_empty()) {
        realtime.api_version = version;
    }
    if let Some(deployment) = var("AZURE_OPENAI_REALTIME_DEPLOYMENT").filter(|v| !v.is_empty()) {
        realtime.deployment = deployment;
    }

    let livekit = &mut config.livekit;
    if let Some(url) = var("LIVEKIT_URL") {
        livekit.url = url;
    }
    if let Some(key) = var("LIVEKIT_API_KEY") {
        livekit.api_key = key;
    }
    if let Some(secret) = var("LIVEKIT_API_SECRET") {
        livekit.api_secret = secret;
    }
}
