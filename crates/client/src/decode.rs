//! Incremental decoding of streamed chat responses.
//!
//! Backends speak one of two line-oriented wire formats: SSE (`data: {json}`
//! lines with a `data: [DONE]` sentinel) or NDJSON (bare `{json}` lines,
//! `{"done": true}` at the end). The decoder auto-detects per line, so the
//! caller never needs to know which one is in use. Bytes are buffered
//! across chunk boundaries and only complete lines are parsed; a malformed
//! line is logged and skipped, never aborting the stream.
//!
//! A second pass separates inline `<think>…</think>` reasoning markup from
//! the visible answer, buffering partially received markers so content is
//! never emitted with reasoning markup in it.

use crate::StreamDelta;
use serde::Deserialize;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Incremental decoder for one response stream.
///
/// Each call owns its own decoder; there is no shared state between
/// streams. Feed raw chunks with [`push`](Self::push), then call
/// [`finish`](Self::finish) at end-of-stream.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Undecoded bytes, at most one incomplete trailing line
    buf: Vec<u8>,
    /// Inline reasoning-marker state, carried across lines
    filter: ThinkFilter,
}

impl StreamDecoder {
    /// Create a decoder with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of bytes and decode every complete line in it.
    ///
    /// Deltas come back in the exact order their source lines arrived.
    /// The trailing partial line, if any, is retained for the next chunk.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamDelta> {
        self.buf.extend_from_slice(bytes);

        let mut deltas = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(delta) = self.decode_line(line.trim()) {
                if !delta.is_empty() {
                    deltas.push(delta);
                }
            }
        }
        deltas
    }

    /// Signal end-of-stream.
    ///
    /// Discards any incomplete trailing line (it cannot be parsed) and
    /// flushes text still held by the reasoning-marker filter.
    pub fn finish(&mut self) -> Option<StreamDelta> {
        if !self.buf.is_empty() {
            tracing::trace!(
                "discarding {} bytes of incomplete trailing line",
                self.buf.len()
            );
            self.buf.clear();
        }

        let (content, reasoning) = self.filter.finish();
        let delta = StreamDelta { content, reasoning };
        (!delta.is_empty()).then_some(delta)
    }

    /// Decode a single complete line into a delta, if it carries one.
    fn decode_line(&mut self, line: &str) -> Option<StreamDelta> {
        let payload = if let Some(rest) = line.strip_prefix("data:") {
            rest.trim_start()
        } else if line.starts_with('{') {
            line
        } else {
            // Comments, `event:` lines and other framing noise.
            return None;
        };
        if payload.is_empty() || payload == "[DONE]" {
            return None;
        }

        let chunk: WireChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!("skipping malformed stream line: {e}");
                return None;
            }
        };

        let mut delta = StreamDelta::default();
        if let Some(reasoning) = chunk.reasoning_fragment() {
            delta.reasoning.push_str(reasoning);
        }
        match chunk.content_fragment() {
            Some(content) => {
                let (content, reasoning) = self.filter.push(content);
                delta.content = content;
                delta.reasoning.push_str(&reasoning);
            }
            None if chunk.done => tracing::trace!("end-of-turn marker"),
            None => {}
        }
        Some(delta)
    }
}

/// One parsed stream object, covering all three known shapes.
#[derive(Debug, Default, Deserialize)]
struct WireChunk {
    /// OpenAI-compatible delta choices
    #[serde(default)]
    choices: Vec<WireChoice>,

    /// Ollama native streaming message
    message: Option<WireMessage>,

    /// Legacy single-field completion
    response: Option<String>,

    /// Top-level reasoning field
    reasoning: Option<String>,

    /// End-of-turn flag in the native format
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    #[serde(default)]
    delta: WireDelta,
}

#[derive(Debug, Default, Deserialize)]
struct WireDelta {
    content: Option<String>,
    reasoning_content: Option<String>,
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

impl WireChunk {
    /// First non-empty content field, in precedence order:
    /// chat-completion delta, native message, legacy response.
    fn content_fragment(&self) -> Option<&str> {
        let delta = self.choices.first().and_then(|c| c.delta.content.as_deref());
        let message = self.message.as_ref().and_then(|m| m.content.as_deref());
        [delta, message, self.response.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }

    /// First non-empty reasoning field: delta-level, then top-level.
    fn reasoning_fragment(&self) -> Option<&str> {
        let delta = self.choices.first().and_then(|c| {
            c.delta
                .reasoning_content
                .as_deref()
                .or(c.delta.reasoning.as_deref())
        });
        [delta, self.reasoning.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

/// Splits inline `<think>…</think>` spans out of content text.
///
/// Text that could still turn into a marker (a suffix that is a prefix of
/// the next expected marker) is held back until more bytes resolve it.
#[derive(Debug, Default)]
struct ThinkFilter {
    /// Inside an open reasoning span
    in_think: bool,
    /// Held-back text, not yet classifiable
    held: String,
}

impl ThinkFilter {
    /// Feed content text; returns `(content, reasoning)` safe to emit.
    fn push(&mut self, text: &str) -> (String, String) {
        self.held.push_str(text);

        let mut content = String::new();
        let mut reasoning = String::new();
        loop {
            let marker = if self.in_think { THINK_CLOSE } else { THINK_OPEN };
            let out = if self.in_think {
                &mut reasoning
            } else {
                &mut content
            };

            if let Some(pos) = self.held.find(marker) {
                out.push_str(&self.held[..pos]);
                self.held.drain(..pos + marker.len());
                self.in_think = !self.in_think;
            } else {
                let keep = partial_marker_suffix(&self.held, marker);
                let emit = self.held.len() - keep;
                out.push_str(&self.held[..emit]);
                self.held.drain(..emit);
                break;
            }
        }
        (content, reasoning)
    }

    /// Flush held text at end of stream.
    ///
    /// A marker that never completed is ordinary text; an open span that
    /// never closed stays reasoning.
    fn finish(&mut self) -> (String, String) {
        let held = std::mem::take(&mut self.held);
        if self.in_think {
            (String::new(), held)
        } else {
            (held, String::new())
        }
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of
/// `marker`, i.e. bytes that may complete into the marker later.
fn partial_marker_suffix(text: &str, marker: &str) -> usize {
    let max = marker.len().saturating_sub(1).min(text.len());
    for len in (1..=max).rev() {
        if text.is_char_boundary(text.len() - len) && marker.starts_with(&text[text.len() - len..])
        {
            return len;
        }
    }
    0
}
