//! Agent session lifecycle on top of a [`RealtimeModel`].

use crate::agent::Agent;
use crate::error::VoiceError;
use crate::metrics::{MetricsCollectedEvent, RealtimeModelMetrics};
use crate::model::{
    RealtimeConnection, RealtimeModel, ResponseOutcome, Room, RoomInputOptions,
    RoomOutputOptions, SessionOptions,
};
use folio_types::{last_assistant_message, ChatItem};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Upper bound on consecutive tool-call rounds within one reply.
const MAX_TOOL_ROUNDS: usize = 4;

pub type MetricsHandler = Arc<dyn Fn(&MetricsCollectedEvent) + Send + Sync>;

type Connection = Box<dyn RealtimeConnection>;

enum Lifecycle {
    Created,
    /// `connection` is `None` after a failed exchange; the next request
    /// reconnects with the same options.
    Started {
        agent: Agent,
        options: SessionOptions,
        connection: Option<Connection>,
    },
    Closed,
}

/// Items produced while answering one request.
#[derive(Debug, Clone, Default)]
pub struct ReplyHandle {
    pub chat_items: Vec<ChatItem>,
}

impl ReplyHandle {
    /// The last assistant message of the reply, if there is one.
    pub fn last_assistant_message(&self) -> Option<&ChatItem> {
        last_assistant_message(&self.chat_items)
    }
}

/// A conversation between one [`Agent`] and a realtime model.
///
/// The lifecycle is `Created -> Started -> Closed`. All transitions and
/// every exchange with the provider happen under one async mutex, so
/// concurrent callers on the same session are served one at a time and a
/// session is never connected twice.
///
/// An exchange that fails after the request went out leaves the provider
/// stream in an unknown position. The connection is then closed and
/// dropped, and the following request opens a fresh one.
pub struct AgentSession {
    model: Arc<dyn RealtimeModel>,
    state: Mutex<Lifecycle>,
    metrics_handlers: RwLock<Vec<MetricsHandler>>,
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("model", &self.model.label())
            .finish_non_exhaustive()
    }
}

impl AgentSession {
    pub fn new(model: Arc<dyn RealtimeModel>) -> Self {
        Self {
            model,
            state: Mutex::new(Lifecycle::Created),
            metrics_handlers: RwLock::new(Vec::new()),
        }
    }

    /// Registers `handler` to run after every provider response.
    pub fn on_metrics_collected<F>(&self, handler: F)
    where
        F: Fn(&MetricsCollectedEvent) + Send + Sync + 'static,
    {
        self.metrics_handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Connects the session to the model.
    ///
    /// Returns `Ok(true)` if this call performed the start and `Ok(false)` if
    /// the session was already running. Fails with [`VoiceError::Closed`]
    /// once the session has been closed.
    pub async fn start(
        &self,
        agent: Agent,
        room: &Room,
        input: RoomInputOptions,
        output: RoomOutputOptions,
    ) -> Result<bool, VoiceError> {
        let mut state = self.state.lock().await;
        match &*state {
            Lifecycle::Started { .. } => return Ok(false),
            Lifecycle::Closed => return Err(VoiceError::Closed),
            Lifecycle::Created => {}
        }

        let options = SessionOptions {
            instructions: agent.instructions.clone(),
            room_name: room.name.clone(),
            input,
            output,
            tools: agent.tool_specs(),
        };
        let connection = self.model.connect(&options).await?;

        info!(
            room = %room.name,
            model = self.model.label(),
            tools = options.tools.len(),
            "agent session started"
        );

        *state = Lifecycle::Started {
            agent,
            options,
            connection: Some(connection),
        };
        Ok(true)
    }

    pub async fn is_started(&self) -> bool {
        matches!(&*self.state.lock().await, Lifecycle::Started { .. })
    }

    /// Sends `user_input` and waits for the complete reply, running any tool
    /// calls the model makes along the way.
    pub async fn generate_reply(&self, user_input: &str) -> Result<ReplyHandle, VoiceError> {
        let mut state = self.state.lock().await;
        let (agent, options, slot) = started(&mut state)?;
        let room_name = options.room_name.as_str();

        let connection = self.live_connection(options, slot).await?;
        let result = self
            .reply_with_tools(agent, room_name, connection, user_input)
            .await;
        if let Err(e) = &result {
            discard(room_name, slot, e).await;
        }
        result
    }

    /// Has the agent speak `text` verbatim.
    pub async fn say(&self, text: &str) -> Result<ReplyHandle, VoiceError> {
        let mut state = self.state.lock().await;
        let (_, options, slot) = started(&mut state)?;
        let room_name = options.room_name.as_str();

        let instructions = format!(
            "Say exactly the following to the user and nothing else: \"{}\"",
            text
        );
        let connection = self.live_connection(options, slot).await?;
        let result = connection.generate_reply(None, Some(&instructions)).await;
        match result {
            Ok(outcome) => {
                self.emit_metrics(&outcome.metrics);
                Ok(ReplyHandle {
                    chat_items: outcome.chat_items,
                })
            }
            Err(e) => {
                discard(room_name, slot, &e).await;
                Err(e)
            }
        }
    }

    /// Releases the provider connection. Closing twice is a no-op.
    pub async fn close(&self) -> Result<(), VoiceError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, Lifecycle::Closed) {
            Lifecycle::Started {
                options,
                connection,
                ..
            } => {
                info!(room = %options.room_name, "agent session closed");
                match connection {
                    Some(mut connection) => connection.close().await,
                    None => Ok(()),
                }
            }
            Lifecycle::Created | Lifecycle::Closed => Ok(()),
        }
    }

    /// Returns the open connection, reconnecting if the last one was dropped.
    async fn live_connection<'a>(
        &self,
        options: &SessionOptions,
        slot: &'a mut Option<Connection>,
    ) -> Result<&'a mut Connection, VoiceError> {
        if slot.is_none() {
            info!(room = %options.room_name, "reconnecting to realtime model");
            *slot = Some(self.model.connect(options).await?);
        }
        slot.as_mut().ok_or(VoiceError::NotStarted)
    }

    async fn reply_with_tools(
        &self,
        agent: &Agent,
        room_name: &str,
        connection: &mut Connection,
        user_input: &str,
    ) -> Result<ReplyHandle, VoiceError> {
        let mut items = Vec::new();
        let mut outcome = connection.generate_reply(Some(user_input), None).await?;
        let mut rounds = 0;

        loop {
            self.emit_metrics(&outcome.metrics);
            let calls = owned_function_calls(&outcome);
            items.append(&mut outcome.chat_items);

            if calls.is_empty() {
                break;
            }
            if rounds == MAX_TOOL_ROUNDS {
                warn!(room = %room_name, "tool call limit reached, returning partial reply");
                break;
            }
            rounds += 1;

            for (call_id, name, arguments) in calls {
                let output = match agent.invoke_tool(&name, &arguments) {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(room = %room_name, tool = %name, "tool call failed: {}", e);
                        format!("Tool error: {}", e)
                    }
                };
                debug!(room = %room_name, tool = %name, "tool call answered");
                connection.add_tool_output(&call_id, &output).await?;
                items.push(ChatItem::FunctionCallOutput { call_id, output });
            }

            outcome = connection.generate_reply(None, None).await?;
        }

        Ok(ReplyHandle { chat_items: items })
    }

    fn emit_metrics(&self, metrics: &RealtimeModelMetrics) {
        let handlers = self
            .metrics_handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let event = MetricsCollectedEvent {
            metrics: metrics.clone(),
        };
        for handler in handlers {
            handler(&event);
        }
    }
}

fn started(
    state: &mut Lifecycle,
) -> Result<(&Agent, &SessionOptions, &mut Option<Connection>), VoiceError> {
    match state {
        Lifecycle::Started {
            agent,
            options,
            connection,
        } => Ok((agent, options, connection)),
        Lifecycle::Created => Err(VoiceError::NotStarted),
        Lifecycle::Closed => Err(VoiceError::Closed),
    }
}

/// Closes and forgets the connection after a failed exchange.
async fn discard(room_name: &str, slot: &mut Option<Connection>, cause: &VoiceError) {
    if let Some(mut connection) = slot.take() {
        warn!(room = %room_name, "dropping realtime connection: {}", cause);
        if let Err(e) = connection.close().await {
            debug!(room = %room_name, "error closing dropped connection: {}", e);
        }
    }
}

fn owned_function_calls(outcome: &ResponseOutcome) -> Vec<(String, String, String)> {
    outcome
        .function_calls()
        .map(|(call_id, name, arguments)| {
            (call_id.to_string(), name.to_string(), arguments.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::CONTACT_LINK_TOOL;
    use crate::metrics::UsageCollector;
    use async_trait::async_trait;
    use folio_types::Role;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Records what the session sends and replays canned responses.
    #[derive(Default)]
    struct Script {
        responses: StdMutex<VecDeque<Vec<ChatItem>>>,
        connects: AtomicUsize,
        closes: AtomicUsize,
        sent: StdMutex<Vec<String>>,
        /// Number of upcoming replies that time out.
        failing_replies: AtomicUsize,
    }

    struct ScriptedModel(Arc<Script>);

    struct ScriptedConnection(Arc<Script>);

    #[async_trait]
    impl RealtimeModel for ScriptedModel {
        fn label(&self) -> &str {
            "scripted"
        }

        fn validate(&self) -> Result<(), VoiceError> {
            Ok(())
        }

        async fn connect(
            &self,
            _options: &SessionOptions,
        ) -> Result<Box<dyn RealtimeConnection>, VoiceError> {
            tokio::task::yield_now().await;
            self.0.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedConnection(self.0.clone())))
        }
    }

    #[async_trait]
    impl RealtimeConnection for ScriptedConnection {
        async fn generate_reply(
            &mut self,
            user_input: Option<&str>,
            instructions: Option<&str>,
        ) -> Result<ResponseOutcome, VoiceError> {
            let record = match (user_input, instructions) {
                (Some(text), _) => format!("user:{}", text),
                (None, Some(text)) => format!("instructions:{}", text),
                (None, None) => "continue".to_string(),
            };
            self.0.sent.lock().unwrap().push(record);
            if self
                .0
                .failing_replies
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(VoiceError::Timeout(1));
            }
            let chat_items = self
                .0
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            Ok(ResponseOutcome {
                chat_items,
                metrics: RealtimeModelMetrics {
                    input_tokens: 10,
                    output_tokens: 5,
                    ..RealtimeModelMetrics::empty("scripted", "resp")
                },
            })
        }

        async fn add_tool_output(&mut self, call_id: &str, output: &str) -> Result<(), VoiceError> {
            self.0
                .sent
                .lock()
                .unwrap()
                .push(format!("tool:{}:{}", call_id, output));
            Ok(())
        }

        async fn close(&mut self) -> Result<(), VoiceError> {
            self.0.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn assistant(text: &str) -> ChatItem {
        ChatItem::Message {
            id: "a".to_string(),
            role: Role::Assistant,
            text_content: Some(text.to_string()),
        }
    }

    fn session_with(responses: Vec<Vec<ChatItem>>) -> (Arc<Script>, AgentSession) {
        let script = Arc::new(Script::default());
        *script.responses.lock().unwrap() = responses.into();
        let session = AgentSession::new(Arc::new(ScriptedModel(script.clone())));
        (script, session)
    }

    async fn start(session: &AgentSession) -> Result<bool, VoiceError> {
        session
            .start(
                Agent::portfolio(),
                &Room::new("test-room"),
                RoomInputOptions::default(),
                RoomOutputOptions::default(),
            )
            .await
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (script, session) = session_with(vec![]);
        assert!(!session.is_started().await);
        assert!(start(&session).await.unwrap());
        assert!(!start(&session).await.unwrap());
        assert!(session.is_started().await);
        assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_starts_connect_once() {
        let (script, session) = session_with(vec![]);
        let session = Arc::new(session);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = session.clone();
                tokio::spawn(async move { start(&session).await.unwrap() })
            })
            .collect();

        let mut started = 0;
        for handle in handles {
            if handle.await.unwrap() {
                started += 1;
            }
        }
        assert_eq!(started, 1);
        assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reply_requires_start() {
        let (_, session) = session_with(vec![]);
        assert!(matches!(
            session.generate_reply("hi").await,
            Err(VoiceError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn reply_returns_items_and_fires_metrics() {
        let (_, session) = session_with(vec![vec![assistant("Hello!")]]);
        let usage = Arc::new(UsageCollector::new());
        let collector = usage.clone();
        session.on_metrics_collected(move |ev| collector.collect(&ev.metrics));

        start(&session).await.unwrap();
        let reply = session.generate_reply("hi").await.unwrap();

        assert_eq!(
            reply.last_assistant_message().and_then(ChatItem::text),
            Some("Hello!")
        );
        assert_eq!(usage.summary().responses, 1);
        assert_eq!(usage.summary().llm_prompt_tokens, 10);
    }

    #[tokio::test]
    async fn tool_calls_are_answered_before_final_reply() {
        let call = ChatItem::FunctionCall {
            call_id: "call_1".to_string(),
            name: CONTACT_LINK_TOOL.to_string(),
            arguments: r#"{"query":"github"}"#.to_string(),
        };
        let (script, session) =
            session_with(vec![vec![call], vec![assistant("Here is the link.")]]);

        start(&session).await.unwrap();
        let reply = session.generate_reply("what's your github?").await.unwrap();

        assert_eq!(
            reply.last_assistant_message().and_then(ChatItem::text),
            Some("Here is the link.")
        );
        assert!(reply.chat_items.iter().any(|item| matches!(
            item,
            ChatItem::FunctionCallOutput { output, .. } if output.starts_with("https://github.com")
        )));

        let sent = script.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0], "user:what's your github?");
        assert!(sent[1].starts_with("tool:call_1:https://github.com/Priyanka2-ui"));
        assert_eq!(sent[2], "continue");
    }

    #[tokio::test]
    async fn tool_rounds_are_bounded() {
        let call = || ChatItem::FunctionCall {
            call_id: "loop".to_string(),
            name: CONTACT_LINK_TOOL.to_string(),
            arguments: r#"{"query":"email"}"#.to_string(),
        };
        let responses = (0..10).map(|_| vec![call()]).collect();
        let (script, session) = session_with(responses);

        start(&session).await.unwrap();
        let reply = session.generate_reply("loop forever").await.unwrap();

        assert!(reply.last_assistant_message().is_none());
        let continues = script
            .sent
            .lock()
            .unwrap()
            .iter()
            .filter(|s| *s == "continue")
            .count();
        assert_eq!(continues, MAX_TOOL_ROUNDS);
    }

    #[tokio::test]
    async fn say_sends_instructions() {
        let (script, session) = session_with(vec![vec![assistant("Hello! I'm here.")]]);
        start(&session).await.unwrap();
        session.say("Hello! I'm here.").await.unwrap();

        let sent = script.sent.lock().unwrap().clone();
        assert!(sent[0].starts_with("instructions:Say exactly"));
    }

    #[tokio::test]
    async fn close_releases_connection_once_and_blocks_restart() {
        let (script, session) = session_with(vec![]);
        start(&session).await.unwrap();

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);

        assert!(matches!(start(&session).await, Err(VoiceError::Closed)));
        assert!(matches!(
            session.generate_reply("hi").await,
            Err(VoiceError::Closed)
        ));
    }

    #[tokio::test]
    async fn failed_reply_drops_connection_and_next_reply_reconnects() {
        let (script, session) = session_with(vec![vec![assistant("answer to second")]]);
        script.failing_replies.store(1, Ordering::SeqCst);
        start(&session).await.unwrap();

        assert!(matches!(
            session.generate_reply("first").await,
            Err(VoiceError::Timeout(1))
        ));
        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
        assert!(session.is_started().await);

        let reply = session.generate_reply("second").await.unwrap();
        assert_eq!(
            reply.last_assistant_message().and_then(ChatItem::text),
            Some("answer to second")
        );
        assert_eq!(script.connects.load(Ordering::SeqCst), 2);

        session.close().await.unwrap();
        assert_eq!(script.closes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn close_after_failed_reply_does_not_close_twice() {
        let (script, session) = session_with(vec![]);
        script.failing_replies.store(1, Ordering::SeqCst);
        start(&session).await.unwrap();

        assert!(session.say("Hello!").await.is_err());
        session.close().await.unwrap();

        assert_eq!(script.closes.load(Ordering::SeqCst), 1);
        assert_eq!(script.connects.load(Ordering::SeqCst), 1);
    }
}
