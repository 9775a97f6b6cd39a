//! Resilient, cancellable HTTP transport.
//!
//! One request/response (or request/stream) exchange per call, no
//! internal retries. Every terminal outcome is classified exactly once
//! into a [`ClientError`] at the point of detection. Waits are bounded:
//! the timeout is inferred from the target host unless the caller
//! overrides it, and streaming calls get a longer first-byte allowance
//! for cold model loads — after the first byte only cancellation
//! terminates the stream.

use crate::{
    StreamDelta,
    connectivity::{AlwaysOnline, Connectivity},
    decode::StreamDecoder,
    endpoint::{self, NATIVE_TAGS_SUFFIX, OPENAI_MODELS_SUFFIX},
    error::ClientError,
    request::{ProbeBody, StreamRequest},
};
use async_stream::try_stream;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::{Host, Url};

/// Bound for private, loopback and `.local` hosts.
const LOCAL_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Bound for all other hosts.
const REMOTE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// First-byte bound for streaming calls; cold model loads are slow.
const STREAM_FIRST_BYTE_TIMEOUT: Duration = Duration::from_millis(15_000);

/// HTTP transport with connectivity pre-check and merged cancellation.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    connectivity: Arc<dyn Connectivity>,
}

impl Transport {
    /// Create a transport with a fresh client and no reachability probe.
    pub fn new() -> Self {
        Self::with_connectivity(Client::new(), Arc::new(AlwaysOnline))
    }

    /// Create a transport with an injected connectivity probe.
    pub fn with_connectivity(client: Client, connectivity: Arc<dyn Connectivity>) -> Self {
        Self {
            client,
            connectivity,
        }
    }

    /// Stream one chat completion.
    ///
    /// Deltas are emitted in the order their source lines arrived. The
    /// request's cancellation token is merged with the internal
    /// first-byte timeout: a caller-initiated abort surfaces as
    /// [`ClientError::StreamAbort`], the internal deadline as
    /// [`ClientError::Timeout`], and the two are never conflated.
    pub fn stream_chat(
        &self,
        request: StreamRequest,
    ) -> impl Stream<Item = Result<StreamDelta, ClientError>> + Send {
        let transport = self.clone();
        try_stream! {
            let url = endpoint::resolve_chat_url(&request.base_url);
            let timeout = effective_timeout(&request.base_url, request.timeout_override, true);
            let token = request.cancel.child_token();
            let body = request.chat_body();
            if let Ok(body) = serde_json::to_string(&body) {
                tracing::trace!("request: {body}");
            }

            let response = transport
                .send_bounded(transport.client.post(&url).json(&body), timeout, &token)
                .await?;
            tracing::debug!("connected to {url}, streaming");

            let mut decoder = StreamDecoder::new();
            let mut stream = response.bytes_stream();
            loop {
                // `?` cannot appear inside a nested macro within
                // `try_stream!`, so select resolves to a value first.
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => Some(Err(ClientError::StreamAbort)),
                    next = stream.next() => {
                        next.map(|result| result.map_err(|e| transport.classify(e, timeout)))
                    }
                };
                match next {
                    Some(Ok(bytes)) => {
                        tracing::trace!("chunk: {} bytes", bytes.len());
                        for delta in decoder.push(&bytes) {
                            yield delta;
                        }
                    }
                    Some(Err(e)) => Err(e)?,
                    None => break,
                }
            }
            if let Some(delta) = decoder.finish() {
                yield delta;
            }
            tracing::debug!("stream closed");
        }
    }

    /// Verify the backend answers chat completions at all.
    ///
    /// One non-streaming probe with a minimal message and `max_tokens: 1`.
    pub async fn test_connection(&self, base_url: &str, model: &str) -> Result<(), ClientError> {
        let url = endpoint::resolve_chat_url(base_url);
        let timeout = effective_timeout(base_url, None, false);
        let body = ProbeBody::new(model);
        self.send_bounded(
            self.client.post(&url).json(&body),
            timeout,
            &CancellationToken::new(),
        )
        .await
        .map(|_| ())
    }

    /// List the models the backend serves.
    ///
    /// Tries the native tag listing first, then falls back to the
    /// OpenAI-compatible model listing.
    pub async fn list_models(&self, base_url: &str) -> Result<Vec<CompactString>, ClientError> {
        let root = endpoint::server_root(base_url);
        let timeout = effective_timeout(base_url, None, false);
        let token = CancellationToken::new();

        match self.fetch_tags(&root, timeout, &token).await {
            Ok(models) => Ok(models),
            Err(e) => {
                tracing::debug!("native model listing failed ({e}), trying the OpenAI path");
                self.fetch_openai_models(&root, timeout, &token).await
            }
        }
    }

    /// `GET <root>/api/tags` — Ollama-style listing.
    async fn fetch_tags(
        &self,
        root: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<CompactString>, ClientError> {
        let url = format!("{root}{NATIVE_TAGS_SUFFIX}");
        let response = self
            .send_bounded(self.client.get(&url), timeout, cancel)
            .await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Unknown(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// `GET <root>/v1/models` — OpenAI-compatible listing.
    async fn fetch_openai_models(
        &self,
        root: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<CompactString>, ClientError> {
        let url = format!("{root}{OPENAI_MODELS_SUFFIX}");
        let response = self
            .send_bounded(self.client.get(&url), timeout, cancel)
            .await?;
        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Unknown(e.to_string()))?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    /// Issue one request under the merged cancellation signal.
    ///
    /// Checks connectivity before any I/O, races the send against both
    /// the caller's token and the internal deadline, and turns a non-2xx
    /// status into [`ClientError::Http`].
    async fn send_bounded(
        &self,
        request: RequestBuilder,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, ClientError> {
        if !self.connectivity.is_online() {
            return Err(ClientError::Offline);
        }

        // `biased` keeps an abort that races the deadline classified as
        // an abort.
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::StreamAbort),
            _ = tokio::time::sleep(timeout) => return Err(ClientError::Timeout(timeout)),
            result = request.send() => result.map_err(|e| self.classify(e, timeout))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unrecognized status")
                    .to_owned(),
            });
        }
        Ok(response)
    }

    /// Classify a transport-layer failure, once.
    fn classify(&self, error: reqwest::Error, timeout: Duration) -> ClientError {
        // The device may have dropped offline mid-attempt.
        if !self.connectivity.is_online() {
            return ClientError::Offline;
        }
        if error.is_timeout() {
            return ClientError::Timeout(timeout);
        }
        if error.is_connect() || error.is_request() {
            return ClientError::Unreachable(error.to_string());
        }
        ClientError::Unknown(error.to_string())
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

/// The effective first-byte timeout for a call.
///
/// A caller override always wins. Streaming calls get the long cold-load
/// bound; otherwise the bound is inferred from the target host, since a
/// box on the LAN either answers fast or not at all.
fn effective_timeout(base_url: &str, override_: Option<Duration>, streaming: bool) -> Duration {
    if let Some(timeout) = override_ {
        return timeout;
    }
    if streaming {
        return STREAM_FIRST_BYTE_TIMEOUT;
    }
    if is_local_host(base_url) {
        LOCAL_TIMEOUT
    } else {
        REMOTE_TIMEOUT
    }
}

/// Whether the URL points at a private, loopback or `.local` host.
fn is_local_host(base_url: &str) -> bool {
    let Ok(url) = Url::parse(base_url) else {
        return false;
    };
    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost" || domain.ends_with(".local"),
        Some(Host::Ipv4(ip)) => ip.is_loopback() || ip.is_private() || ip.is_link_local(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Ollama-style `GET /api/tags` payload.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: CompactString,
}

/// OpenAI-compatible `GET /v1/models` payload.
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: CompactString,
}
