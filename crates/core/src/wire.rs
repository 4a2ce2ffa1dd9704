//! JSON bodies exchanged between the client and the chat endpoint.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// `POST /api/chat` request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The pending user turns, oldest first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,

    /// Single-turn form used by older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Transcript before the pending turns.
    #[serde(default)]
    pub conversation_history: Vec<Message>,
}

impl ChatRequest {
    /// Build a request carrying a batch of user turns.
    pub fn batch(messages: Vec<String>, conversation_history: Vec<Message>) -> Self {
        Self {
            messages: Some(messages),
            message: None,
            conversation_history,
        }
    }

    /// The normalized user turns.
    ///
    /// A non-blank `message` wins. Otherwise every non-blank entry of
    /// `messages`, in order. Turns are passed through untrimmed.
    pub fn user_turns(&self) -> Vec<String> {
        if let Some(single) = self.message.as_deref()
            && !single.trim().is_empty()
        {
            return vec![single.to_string()];
        }

        self.messages
            .iter()
            .flatten()
            .filter(|m| !m.trim().is_empty())
            .cloned()
            .collect()
    }
}

/// A retrieved source returned next to the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub citation: String,
    pub similarity: f32,
}

/// `POST /api/chat` success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Failure body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
