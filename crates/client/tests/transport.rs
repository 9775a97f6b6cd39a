//! HTTP-level tests for the resilient transport.

use futures_util::StreamExt;
use narwhal_client::{
    Connectivity, ErrorKind, Message, StreamDelta, StreamRequest, Transport,
};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Probe that always reports the device offline.
struct OfflineProbe;

impl Connectivity for OfflineProbe {
    fn is_online(&self) -> bool {
        false
    }
}

fn offline_transport() -> Transport {
    Transport::with_connectivity(narwhal_client::Client::new(), Arc::new(OfflineProbe))
}

/// Drain a chat stream into accumulated content/reasoning or the first error.
async fn drain(
    transport: &Transport,
    request: StreamRequest,
) -> Result<(String, String), narwhal_client::ClientError> {
    let stream = transport.stream_chat(request);
    let mut stream = pin!(stream);
    let mut content = String::new();
    let mut reasoning = String::new();
    while let Some(item) = stream.next().await {
        let delta: StreamDelta = item?;
        content.push_str(&delta.content);
        reasoning.push_str(&delta.reasoning);
    }
    Ok((content, reasoning))
}

#[tokio::test]
async fn offline_probe_fails_without_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = offline_transport()
        .test_connection(&server.uri(), "llama3")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Offline);
    server.verify().await;
}

#[tokio::test]
async fn offline_probe_fails_streaming_too() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = StreamRequest::new(server.uri(), "llama3", vec![Message::user("hi")]);
    let err = drain(&offline_transport(), request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Offline);
    server.verify().await;
}

#[tokio::test]
async fn not_found_carries_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = Transport::new()
        .test_connection(&server.uri(), "missing-model")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.status(), Some(404));
    assert!(err.user_message().contains("404"));
}

#[tokio::test]
async fn server_error_surfaces_on_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let request = StreamRequest::new(server.uri(), "llama3", vec![Message::user("hi")]);
    let err = drain(&Transport::new(), request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn unreachable_server_is_classified() {
    // Nothing listens on this port.
    let err = Transport::new()
        .test_connection("http://127.0.0.1:9", "llama3")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unreachable);
}

#[tokio::test]
async fn sse_stream_decodes_end_to_end() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n"
    );
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let request = StreamRequest::new(server.uri(), "llama3", vec![Message::user("hi")]);
    let (content, reasoning) = drain(&Transport::new(), request).await.expect("stream");
    assert_eq!(content, "Hello");
    assert_eq!(reasoning, "");
}

#[tokio::test]
async fn ndjson_stream_separates_reasoning() {
    let body = concat!(
        "{\"message\":{\"content\":\"<think>plan</think>\"}}\n",
        "{\"message\":{\"content\":\"answer\"}}\n",
        "{\"done\":true}\n"
    );
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let request = StreamRequest::new(server.uri(), "llama3", vec![Message::user("hi")]);
    let (content, reasoning) = drain(&Transport::new(), request).await.expect("stream");
    assert_eq!(content, "answer");
    assert_eq!(reasoning, "plan");
}

#[tokio::test]
async fn caller_abort_is_not_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let request = StreamRequest::new(server.uri(), "llama3", vec![Message::user("hi")]);
    request.cancel.cancel();
    let err = drain(&Transport::new(), request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StreamAbort);
}

#[tokio::test]
async fn deadline_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut request = StreamRequest::new(server.uri(), "llama3", vec![Message::user("hi")]);
    request.timeout_override = Some(Duration::from_millis(50));
    let err = drain(&Transport::new(), request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn native_model_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "llama3"}, {"name": "qwen3"}]
        })))
        .mount(&server)
        .await;

    let models = Transport::new().list_models(&server.uri()).await.expect("models");
    assert_eq!(models, ["llama3", "qwen3"]);
}

#[tokio::test]
async fn model_listing_falls_back_to_openai_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"id": "gpt-thing"}]
        })))
        .mount(&server)
        .await;

    let models = Transport::new().list_models(&server.uri()).await.expect("models");
    assert_eq!(models, ["gpt-thing"]);
}

#[tokio::test]
async fn connection_probe_sends_one_token_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3",
            "max_tokens": 1,
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    Transport::new()
        .test_connection(&server.uri(), "llama3")
        .await
        .expect("probe");
    server.verify().await;
}

#[tokio::test]
async fn resolved_url_appends_suffix_for_bare_base() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"message\":{\"content\":\"ok\"}}\n",
            "application/x-ndjson",
        ))
        .expect(1)
        .mount(&server)
        .await;

    // Base URL with a trailing slash and no suffix.
    let request = StreamRequest::new(
        format!("{}/", server.uri()),
        "llama3",
        vec![Message::user("hi")],
    );
    let (content, _) = drain(&Transport::new(), request).await.expect("stream");
    assert_eq!(content, "ok");
    server.verify().await;
}
