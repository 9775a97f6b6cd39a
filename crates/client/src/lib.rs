//! Narwhal inference-streaming client core.
//!
//! Talks to a user-configured Ollama-style or OpenAI-compatible backend
//! over a streamed HTTP connection: endpoint resolution, resilient
//! transport with classified failures, incremental decoding of two
//! streaming wire formats into content/reasoning deltas, context-window
//! truncation, and lifecycle-driven cancellation of stale streams.
//!
//! The conversation store, settings UI and rendering live elsewhere;
//! callers pass history and configuration per call and accumulate the
//! emitted deltas.

pub use connectivity::{AlwaysOnline, Connectivity};
pub use context::{TruncationResult, estimate_tokens, message_tokens, truncate_to_fit};
pub use decode::StreamDecoder;
pub use endpoint::{resolve_chat_url, server_root};
pub use error::{ClientError, ErrorKind};
pub use lifecycle::{ActivitySource, HostSource, Lifecycle, Subscription};
pub use message::{Message, Role, StreamDelta};
pub use request::StreamRequest;
pub use reqwest::{self, Client};
pub use tokio_util::sync::CancellationToken;
pub use transport::Transport;

pub mod connectivity;
pub mod context;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod lifecycle;
pub mod message;
mod request;
pub mod transport;
