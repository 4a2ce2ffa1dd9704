//! Prompt envelope: the role-tagged input to a completion call.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Sender};

/// The role a prompt segment plays for the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona, retrieved context, and rules
    System,
    /// The end user
    User,
    /// Prior assistant replies
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl From<Sender> for Role {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Self::User,
            Sender::Assistant => Self::Assistant,
        }
    }
}

/// One role-tagged piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSegment {
    pub role: Role,
    pub text: String,
}

impl PromptSegment {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

impl From<&Message> for PromptSegment {
    fn from(message: &Message) -> Self {
        Self::new(message.sender.into(), message.text.clone())
    }
}

/// An ordered, immutable sequence of prompt segments.
///
/// Built fresh for each request. The only way to get the segments out by
/// value is [`PromptEnvelope::into_segments`], which consumes the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEnvelope {
    segments: Vec<PromptSegment>,
}

impl PromptEnvelope {
    pub fn new(segments: Vec<PromptSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PromptSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments carrying the given role, in order.
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &PromptSegment> {
        self.segments.iter().filter(move |s| s.role == role)
    }

    pub fn into_segments(self) -> Vec<PromptSegment> {
        self.segments
    }
}
