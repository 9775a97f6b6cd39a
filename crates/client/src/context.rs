//! Context-window budgeting and history truncation.
//!
//! Keeps an outgoing conversation inside a model's context length. Token
//! counts come from a calibrated character heuristic, not a model-exact
//! tokenizer; the estimator sits behind a single function so it can be
//! swapped later without touching the truncation algorithm.

use crate::Message;

/// Calibrated chars-per-token ratio for mixed prose and code.
const CHARS_PER_TOKEN: usize = 4;

/// Flat per-message framing overhead, in tokens.
const MESSAGE_OVERHEAD: usize = 4;

/// Share of the context window reserved for the model's own response.
const RESPONSE_RESERVE: f32 = 0.25;

/// Estimate the token count of a piece of text.
///
/// Heuristic: character length over a fixed ratio, rounded up. Calibrated
/// conservatively; real tokenizers vary by model.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Estimated cost of a message including framing overhead.
pub fn message_tokens(message: &Message) -> usize {
    estimate_tokens(&message.content) + MESSAGE_OVERHEAD
}

/// The outcome of a truncation pass.
///
/// Produced once per call and read-only afterward; the counts exist for
/// observability and tests.
#[derive(Debug, Clone)]
pub struct TruncationResult {
    /// System prompt at index 0, then the surviving history in
    /// chronological order
    pub messages: Vec<Message>,

    /// Whether any history message was dropped
    pub truncated: bool,

    /// History length before truncation
    pub original_count: usize,

    /// History messages kept
    pub final_count: usize,

    /// Estimated token total of the emitted messages
    pub estimated_tokens: usize,
}

/// Trim `history` to fit the model's context window.
///
/// A quarter of `context_length` is reserved for the response; the rest
/// is the input budget. The system prompt and the most recent message are
/// always kept and charged first. Remaining history is walked newest to
/// oldest and included greedily until a message would overflow the
/// budget; messages are never split. Survivors come back in their
/// original chronological order.
pub fn truncate_to_fit(
    system_prompt: &str,
    history: &[Message],
    context_length: usize,
) -> TruncationResult {
    let input_budget =
        context_length - (context_length as f32 * RESPONSE_RESERVE).floor() as usize;

    let system = Message::system(system_prompt);
    let system_cost = message_tokens(&system);

    let Some((last, rest)) = history.split_last() else {
        return TruncationResult {
            messages: vec![system],
            truncated: false,
            original_count: 0,
            final_count: 0,
            estimated_tokens: system_cost,
        };
    };

    let last_cost = message_tokens(last);
    let anchor_cost = system_cost + last_cost;

    // The anchors alone may exhaust the budget. Emit just those two; with
    // a single-message history that is the whole conversation, not a cut.
    if anchor_cost > input_budget {
        return TruncationResult {
            messages: vec![system, last.clone()],
            truncated: !rest.is_empty(),
            original_count: history.len(),
            final_count: 1,
            estimated_tokens: anchor_cost,
        };
    }

    let mut remaining = input_budget - anchor_cost;
    let mut estimated_tokens = anchor_cost;
    let mut kept: Vec<&Message> = Vec::new();
    for message in rest.iter().rev() {
        let cost = message_tokens(message);
        if cost > remaining {
            break;
        }
        remaining -= cost;
        estimated_tokens += cost;
        kept.push(message);
    }

    let mut messages = Vec::with_capacity(kept.len() + 2);
    messages.push(system);
    messages.extend(kept.into_iter().rev().cloned());
    messages.push(last.clone());

    let final_count = messages.len() - 1;
    TruncationResult {
        truncated: final_count < history.len(),
        original_count: history.len(),
        final_count,
        estimated_tokens,
        messages,
    }
}
