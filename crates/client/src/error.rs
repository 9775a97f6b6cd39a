//! Classified client failures.
//!
//! Every failure the client surfaces carries exactly one [`ErrorKind`],
//! assigned at the point of detection in the transport and never
//! reclassified upstream. `user_message()` renders the fixed user-facing
//! template for each kind; the `Display` impl keeps the technical detail
//! for diagnostics.

use std::time::Duration;
use thiserror::Error;

/// The closed failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The device reported no connectivity before or during the attempt
    Offline,
    /// The internal deadline elapsed before the server responded
    Timeout,
    /// DNS, connection or TLS failure reaching the server
    Unreachable,
    /// The server answered with a non-2xx status
    Http,
    /// The caller's own cancellation signal fired
    StreamAbort,
    /// Anything that fits no other kind
    Unknown,
}

/// A classified client error.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Device-level connectivity check failed
    #[error("device is offline")]
    Offline,

    /// The internal timeout fired before the first byte arrived
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Transport-layer failure (DNS, connection refused, TLS)
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// Non-2xx HTTP response
    #[error("server returned HTTP {status}: {message}")]
    Http {
        /// The HTTP status code
        status: u16,
        /// The status line or body excerpt
        message: String,
    },

    /// The caller (or the lifecycle observer) cancelled the stream
    #[error("stream aborted")]
    StreamAbort,

    /// Unclassifiable failure, raw message preserved
    #[error("{0}")]
    Unknown(String),
}

impl ClientError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Offline => ErrorKind::Offline,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Unreachable(_) => ErrorKind::Unreachable,
            Self::Http { .. } => ErrorKind::Http,
            Self::StreamAbort => ErrorKind::StreamAbort,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// The HTTP status code, for [`ErrorKind::Http`] only.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The fixed user-facing message for this error.
    ///
    /// Derived solely from the kind; only HTTP errors fold in the status
    /// code, distinguishing not-found from generic server failures.
    pub fn user_message(&self) -> String {
        match self {
            Self::Offline => "No internet connection. Check your network and try again.".into(),
            Self::Timeout(_) => {
                "The server took too long to respond. It may still be loading the model.".into()
            }
            Self::Unreachable(_) => {
                "Could not reach the server. Verify the address and that it is running.".into()
            }
            Self::Http { status: 404, .. } => {
                "The server could not find the requested model or endpoint (HTTP 404).".into()
            }
            Self::Http { status, .. } => {
                format!("The server reported an error (HTTP {status}). Try again later.")
            }
            Self::StreamAbort => "The response was cancelled.".into(),
            Self::Unknown(_) => "Something went wrong. Please try again.".into(),
        }
    }
}
