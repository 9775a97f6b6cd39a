//! Endpoint resolution for divergent backend URL conventions.
//!
//! Users configure anything from a bare `http://host:11434` to a full
//! chat-completion URL copied from their backend's docs. These helpers
//! normalize either form without touching the network: pure string
//! transformation, idempotent by construction.

/// OpenAI-compatible chat completion path
pub const OPENAI_CHAT_SUFFIX: &str = "/v1/chat/completions";

/// Ollama native streaming chat path
pub const NATIVE_CHAT_SUFFIX: &str = "/api/chat";

/// Ollama native model listing path
pub const NATIVE_TAGS_SUFFIX: &str = "/api/tags";

/// OpenAI-compatible model listing path
pub const OPENAI_MODELS_SUFFIX: &str = "/v1/models";

/// Resolve the chat-completion URL for a configured base URL.
///
/// A base that already ends with a known chat path is returned unchanged,
/// so resolving twice equals resolving once. Otherwise trailing slashes
/// are stripped and the OpenAI-compatible suffix appended.
pub fn resolve_chat_url(base: &str) -> String {
    if base.ends_with(OPENAI_CHAT_SUFFIX) || base.ends_with(NATIVE_CHAT_SUFFIX) {
        return base.to_owned();
    }
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(OPENAI_CHAT_SUFFIX) || trimmed.ends_with(NATIVE_CHAT_SUFFIX) {
        return trimmed.to_owned();
    }
    format!("{trimmed}{OPENAI_CHAT_SUFFIX}")
}

/// Recover the bare server root from any configured base URL.
///
/// Strips a known chat or model-listing suffix if present; used when
/// probing the server for available models.
pub fn server_root(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    for suffix in [
        OPENAI_CHAT_SUFFIX,
        NATIVE_CHAT_SUFFIX,
        NATIVE_TAGS_SUFFIX,
        OPENAI_MODELS_SUFFIX,
    ] {
        if let Some(root) = trimmed.strip_suffix(suffix) {
            return root.trim_end_matches('/').to_owned();
        }
    }
    trimmed.to_owned()
}
