//! Message and Transcript domain types.
//!
//! These are the value objects that flow through the whole system:
//! the user types a message → the client appends it to the transcript →
//! the gateway receives it as a pending turn plus prior history → the
//! assistant's reply is appended back onto the transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The end user
    User,
    /// The assistant. Older transcripts call this sender "bot".
    #[serde(alias = "bot")]
    Assistant,
}

/// A single transcript message.
///
/// Immutable once created. Ordering is defined by position in the
/// transcript, never by `timestamp`: coalesced sends can share a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Opaque unique ID
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,

    /// The text content
    pub text: String,

    /// Who sent this message
    pub sender: Sender,

    /// Creation time
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Set on assistant messages that stand in for a failed request
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    fn new(sender: Sender, text: impl Into<String>, is_error: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            is_error,
        }
    }

    /// Create a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text, false)
    }

    /// Create a new assistant reply.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text, false)
    }

    /// Create an assistant message flagged as a failed request.
    pub fn assistant_error(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text, true)
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Accept either a JSON string or a JSON number as a message ID.
///
/// Browser clients historically minted numeric IDs from the clock.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// An ordered, append-only sequence of messages.
///
/// Persisted as a whole snapshot; see [`crate::session::TranscriptStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every message whose ID is not in `excluded`, in transcript order.
    pub fn without(&self, excluded: &[Message]) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| !excluded.iter().any(|e| e.id == m.id))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
