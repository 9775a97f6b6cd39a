//! Per-call request value and its wire body.

use crate::{Message, Role};
use compact_str::CompactString;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one streaming chat call needs.
///
/// Constructed per call and owned exclusively by that call; never shared
/// between turns. The `messages` sequence is expected to be the output of
/// [`crate::context::truncate_to_fit`], with the system prompt at index 0.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// Configured base API URL
    pub base_url: String,

    /// Model to run
    pub model: CompactString,

    /// System prompt, prepended if `messages` does not already carry one
    pub system_prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling cutoff
    pub top_p: Option<f32>,

    /// Context window hint forwarded to the backend (`num_ctx`)
    pub context_length: Option<u32>,

    /// Chronologically ordered conversation
    pub messages: Vec<Message>,

    /// Caller-owned cancellation signal
    pub cancel: CancellationToken,

    /// Overrides the inferred first-byte timeout when set
    pub timeout_override: Option<Duration>,
}

impl StreamRequest {
    /// Create a request with default sampling and no overrides.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<CompactString>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            system_prompt: String::new(),
            temperature: 0.7,
            top_p: None,
            context_length: None,
            messages,
            cancel: CancellationToken::new(),
            timeout_override: None,
        }
    }

    /// Build the streaming wire body.
    pub(crate) fn chat_body(&self) -> ChatBody {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        let has_system = self.messages.first().is_some_and(|m| m.role == Role::System);
        if !has_system && !self.system_prompt.is_empty() {
            messages.push(Message::system(self.system_prompt.clone()));
        }
        messages.extend(self.messages.iter().cloned());

        ChatBody {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            top_p: self.top_p,
            num_ctx: self.context_length,
            stream: true,
        }
    }
}

/// Serialized chat-completion request body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatBody {
    pub model: CompactString,
    pub messages: Vec<Message>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    pub stream: bool,
}

/// Minimal non-streaming body used by the connection test.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProbeBody {
    pub model: CompactString,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ProbeBody {
    /// One-token probe for the given model.
    pub fn new(model: impl Into<CompactString>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user("ping")],
            max_tokens: 1,
            stream: false,
        }
    }
}
