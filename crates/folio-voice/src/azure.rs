//! Azure OpenAI realtime model over WebSocket.

use crate::config::RealtimeConfig;
use crate::error::VoiceError;
use crate::metrics::RealtimeModelMetrics;
use crate::model::{RealtimeConnection, RealtimeModel, ResponseOutcome, SessionOptions};
use crate::protocol::{
    ClientEvent, ClientItem, NoiseReductionSettings, ResponseParams, ServerEvent,
    SessionSettings, TranscriptionSettings,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

const MODEL_LABEL: &str = "azure.realtime";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct AzureRealtimeModel {
    config: RealtimeConfig,
}

impl AzureRealtimeModel {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// The WebSocket URL for the configured deployment.
    pub fn realtime_url(&self) -> Result<Url, VoiceError> {
        let mut url = Url::parse(&self.config.endpoint)
            .map_err(|e| VoiceError::Config(format!("invalid realtime endpoint: {}", e)))?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(VoiceError::Config(format!(
                    "unsupported realtime endpoint scheme: {}",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| VoiceError::Config(format!("cannot switch endpoint to {}", scheme)))?;
        url.set_path("/openai/realtime");
        url.query_pairs_mut()
            .clear()
            .append_pair("api-version", &self.config.api_version)
            .append_pair("deployment", &self.config.deployment);
        Ok(url)
    }

    /// Builds the `session.update` payload for `options`.
    pub fn session_settings(&self, options: &SessionOptions) -> SessionSettings {
        let modalities = if options.output.audio_enabled {
            vec!["text", "audio"]
        } else {
            vec!["text"]
        };

        SessionSettings {
            instructions: options.instructions.clone(),
            modalities,
            voice: self.config.voice.clone(),
            turn_detection: self.config.turn_detection.clone(),
            input_audio_transcription: options.output.transcription_enabled.then(|| {
                TranscriptionSettings {
                    model: self.config.transcription_model.clone(),
                }
            }),
            input_audio_noise_reduction: options.input.noise_cancellation.map(|nc| {
                NoiseReductionSettings {
                    kind: nc.reduction_type(),
                }
            }),
            tools: options.tools.clone(),
            tool_choice: "auto",
        }
    }
}

#[async_trait]
impl RealtimeModel for AzureRealtimeModel {
    fn label(&self) -> &str {
        MODEL_LABEL
    }

    fn validate(&self) -> Result<(), VoiceError> {
        self.config.validate()
    }

    async fn connect(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn RealtimeConnection>, VoiceError> {
        self.validate()?;
        let url = self.realtime_url()?;

        let mut request = url.as_str().into_client_request()?;
        let key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|e| VoiceError::Config(format!("invalid API key header: {}", e)))?;
        request.headers_mut().insert("api-key", key);

        info!(
            room = %options.room_name,
            deployment = %self.config.deployment,
            host = url.host_str().unwrap_or_default(),
            "connecting to realtime model"
        );

        let timeout = self.config.response_timeout();
        let (stream, _) = tokio::time::timeout(timeout, connect_async(request))
            .await
            .map_err(|_| VoiceError::Timeout(timeout.as_secs()))??;

        let mut connection = AzureRealtimeConnection {
            stream,
            timeout,
            room_name: options.room_name.clone(),
            closed: false,
            desynced: false,
        };

        connection
            .wait_for(|event| matches!(event, ServerEvent::SessionCreated {}))
            .await?;
        connection
            .send(&ClientEvent::SessionUpdate {
                session: self.session_settings(options),
            })
            .await?;
        connection
            .wait_for(|event| matches!(event, ServerEvent::SessionUpdated {}))
            .await?;

        debug!(room = %options.room_name, "realtime session configured");
        Ok(Box::new(connection))
    }
}

struct AzureRealtimeConnection {
    stream: WsStream,
    timeout: Duration,
    room_name: String,
    closed: bool,
    /// Set when an exchange failed after its request went out. Events for
    /// that request may still arrive, so the stream can't be reused.
    desynced: bool,
}

impl AzureRealtimeConnection {
    async fn send(&mut self, event: &ClientEvent) -> Result<(), VoiceError> {
        if self.closed {
            return Err(VoiceError::Connection(
                "realtime connection is closed".to_string(),
            ));
        }
        if self.desynced {
            return Err(VoiceError::Connection(
                "realtime connection is out of step after a failed response".to_string(),
            ));
        }
        let json = event.to_json()?;
        self.stream.send(Message::Text(json.into())).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<ServerEvent, VoiceError> {
        loop {
            let message = self.stream.next().await.ok_or_else(|| {
                VoiceError::Connection("realtime stream ended unexpectedly".to_string())
            })??;

            match message {
                Message::Text(text) => return ServerEvent::parse(text.as_str()),
                Message::Close(frame) => {
                    self.closed = true;
                    let reason = frame
                        .map(|f| f.reason.as_str().to_string())
                        .unwrap_or_else(|| "no reason given".to_string());
                    return Err(VoiceError::Connection(format!(
                        "provider closed the connection: {}",
                        reason
                    )));
                }
                // Pings are answered by tungstenite; binary frames are not used.
                _ => continue,
            }
        }
    }

    /// Reads events until `wanted` matches, failing on provider errors.
    async fn wait_for(&mut self, wanted: fn(&ServerEvent) -> bool) -> Result<(), VoiceError> {
        let secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, async {
            loop {
                match self.next_event().await? {
                    ServerEvent::Error { error } => {
                        return Err(VoiceError::Provider(error.to_string()))
                    }
                    event if wanted(&event) => return Ok(()),
                    _ => {}
                }
            }
        })
        .await
        .map_err(|_| VoiceError::Timeout(secs))?
    }

    async fn request_response(
        &mut self,
        user_input: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<ResponseOutcome, VoiceError> {
        if let Some(text) = user_input {
            self.send(&ClientEvent::ConversationItemCreate {
                item: ClientItem::user_text(text),
            })
            .await?;
        }
        self.send(&ClientEvent::ResponseCreate {
            response: instructions.map(|i| ResponseParams {
                instructions: Some(i.to_string()),
            }),
        })
        .await?;
        self.await_response().await
    }

    fn mark_failed<T>(&mut self, result: &Result<T, VoiceError>) {
        if let Err(e) = result {
            if !self.desynced {
                debug!(room = %self.room_name, "realtime connection unusable: {}", e);
            }
            self.desynced = true;
        }
    }

    async fn await_response(&mut self) -> Result<ResponseOutcome, VoiceError> {
        let started = Instant::now();
        let mut first_delta: Option<Duration> = None;
        let secs = self.timeout.as_secs();

        let response = tokio::time::timeout(self.timeout, async {
            loop {
                let event = self.next_event().await?;
                if first_delta.is_none() && event.is_output_delta() {
                    first_delta = Some(started.elapsed());
                }
                match event {
                    ServerEvent::Error { error } => {
                        return Err(VoiceError::Provider(error.to_string()))
                    }
                    ServerEvent::ResponseDone { response } => return Ok(response),
                    _ => {}
                }
            }
        })
        .await
        .map_err(|_| VoiceError::Timeout(secs))??;

        if response.status == "failed" {
            let details = response
                .status_details
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default();
            return Err(VoiceError::Provider(format!("response failed: {}", details)));
        }

        let mut metrics = RealtimeModelMetrics::empty(MODEL_LABEL, "");
        metrics.ttft_ms = first_delta.map(|d| d.as_secs_f64() * 1000.0);
        metrics.duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        response.apply_to(&mut metrics);

        debug!(
            room = %self.room_name,
            request_id = %metrics.request_id,
            status = %response.status,
            items = response.output.len(),
            "realtime response complete"
        );

        Ok(ResponseOutcome {
            chat_items: response.chat_items(),
            metrics,
        })
    }
}

#[async_trait]
impl RealtimeConnection for AzureRealtimeConnection {
    async fn generate_reply(
        &mut self,
        user_input: Option<&str>,
        instructions: Option<&str>,
    ) -> Result<ResponseOutcome, VoiceError> {
        let result = self.request_response(user_input, instructions).await;
        self.mark_failed(&result);
        result
    }

    async fn add_tool_output(&mut self, call_id: &str, output: &str) -> Result<(), VoiceError> {
        let result = self
            .send(&ClientEvent::ConversationItemCreate {
                item: ClientItem::FunctionCallOutput {
                    call_id: call_id.to_string(),
                    output: output.to_string(),
                },
            })
            .await;
        self.mark_failed(&result);
        result
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.stream.close(None).await {
            warn!(room = %self.room_name, "error closing realtime connection: {}", e);
        }
        Ok(())
    }
}
