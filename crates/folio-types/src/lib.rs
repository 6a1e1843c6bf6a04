//! Shared types for the Folio voice portfolio.
//!
//! This crate holds the persona definition (system prompt, greeting and the
//! contact link table) and the conversation item model exchanged between the
//! realtime voice layer and the HTTP façade.
//!
//! Nothing here performs I/O. Both `folio-voice` and `folio-server` depend on
//! this crate for their cross-cutting definitions.

pub mod persona;

use serde::{Deserialize, Serialize};

pub use persona::{contact_link_for, ContactLink, CONTACT_LINKS};

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Instructions injected by the application.
    System,
    /// The person talking to the assistant.
    User,
    /// The persona itself.
    Assistant,
}

impl Role {
    /// Returns the wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single item in a realtime conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatItem {
    /// A text (or transcribed audio) message.
    Message {
        id: String,
        role: Role,
        /// Concatenated text of all parts; `None` if the message carried none.
        text_content: Option<String>,
    },
    /// The model asked to run a tool.
    FunctionCall {
        call_id: String,
        name: String,
        /// Raw JSON arguments as produced by the model.
        arguments: String,
    },
    /// The result handed back to the model for a `FunctionCall`.
    FunctionCallOutput { call_id: String, output: String },
}

impl ChatItem {
    /// Returns `true` if this is a message authored by `role`.
    pub fn is_message_from(&self, role: Role) -> bool {
        matches!(self, Self::Message { role: r, .. } if *r == role)
    }

    /// Text of a message item. Other items carry no text.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message { text_content, .. } => text_content.as_deref(),
            _ => None,
        }
    }
}

/// Returns the most recent assistant-authored message in `items`.
pub fn last_assistant_message(items: &[ChatItem]) -> Option<&ChatItem> {
    items
        .iter()
        .rev()
        .find(|item| item.is_message_from(Role::Assistant))
}
