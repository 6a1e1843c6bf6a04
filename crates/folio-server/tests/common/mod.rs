#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use folio_server::{app, AppState};
use folio_types::{ChatItem, Role};
use folio_voice::{
    RealtimeConnection, RealtimeModel, RealtimeModelMetrics, ResponseOutcome, SessionOptions,
    VoiceError,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt; // for oneshot

/// What a scripted response consists of.
#[derive(Debug, Clone)]
pub enum Scripted {
    Items(Vec<ChatItem>),
    Fail(String),
}

/// Shared record of everything the scripted model saw.
#[derive(Debug, Default)]
pub struct Script {
    pub responses: Mutex<VecDeque<Scripted>>,
    pub inputs: Mutex<Vec<String>>,
    pub last_options: Mutex<Option<SessionOptions>>,
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub invalid: Mutex<Option<String>>,
}

impl Script {
    pub fn push(&self, response: Scripted) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// A realtime model that replays [`Script`] responses in order.
pub struct ScriptedModel {
    pub script: Arc<Script>,
}

struct ScriptedConnection {
    script: Arc<Script>,
}

#[async_trait]
impl RealtimeModel for ScriptedModel {
    fn label(&self) -> &str {
        "scripted"
    }

    fn validate(&self) -> Result<(), VoiceError> {
        match self.script.invalid.lock().unwrap().clone() {
            Some(reason) => Err(VoiceError::Config(reason)),
            None => Ok(()),
        }
    }

    async fn connect(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn RealtimeConnection>, VoiceError> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        *self.script.last_options.lock().unwrap() = Some(options.clone());
        Ok(Box::new(ScriptedConnection {
            script: self.script.clone(),
        }))
    }
}

#[async_trait]
impl RealtimeConnection for ScriptedConnection {
    async fn generate_reply(
        &mut self,
        user_input: Option<&str>,
        _instructions: Option<&str>,
    ) -> Result<ResponseOutcome, VoiceError> {
        if let Some(text) = user_input {
            self.script.inputs.lock().unwrap().push(text.to_string());
        }
        let next = self.script.responses.lock().unwrap().pop_front();
        match next.unwrap_or(Scripted::Items(vec![])) {
            Scripted::Items(chat_items) => Ok(ResponseOutcome {
                chat_items,
                metrics: RealtimeModelMetrics {
                    input_tokens: 12,
                    output_tokens: 8,
                    total_tokens: 20,
                    ..RealtimeModelMetrics::empty("scripted", "resp")
                },
            }),
            Scripted::Fail(reason) => Err(VoiceError::Provider(reason)),
        }
    }

    async fn add_tool_output(&mut self, _call_id: &str, _output: &str) -> Result<(), VoiceError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn assistant(text: Option<&str>) -> ChatItem {
    ChatItem::Message {
        id: "item".to_string(),
        role: Role::Assistant,
        text_content: text.map(str::to_string),
    }
}

pub fn user(text: &str) -> ChatItem {
    ChatItem::Message {
        id: "user".to_string(),
        role: Role::User,
        text_content: Some(text.to_string()),
    }
}

/// Builds the router around a fresh scripted model.
pub fn setup() -> (Router, AppState, Arc<Script>) {
    let script = Arc::new(Script::default());
    let model = Arc::new(ScriptedModel {
        script: script.clone(),
    });
    let state = AppState::new(model);
    (app(state.clone()), state, script)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn start_session(app: &Router) -> String {
    let response = send(app, "POST", "/session/start", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["session_id"]
        .as_str()
        .unwrap()
        .to_string()
}
