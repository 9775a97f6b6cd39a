//! Narwhal chat message

use serde::{Deserialize, Serialize};

/// A message in the chat
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Message {
    /// The role of the message
    pub role: Role,

    /// The content of the message
    pub content: String,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Role {
    /// The user role
    #[serde(rename = "user")]
    #[default]
    User,
    /// The assistant role
    #[serde(rename = "assistant")]
    Assistant,
    /// The system role
    #[serde(rename = "system")]
    System,
}

/// One decoded unit of streamed model output.
///
/// Splits the visible answer from reasoning ("thinking") text. Deltas are
/// transient: the caller accumulates them, the client never stores them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDelta {
    /// Visible answer fragment
    pub content: String,

    /// Reasoning fragment, from an out-of-band field or inline markers
    pub reasoning: String,
}

impl StreamDelta {
    /// Whether this delta carries no text at all
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning.is_empty()
    }
}
