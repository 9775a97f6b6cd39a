//! Tests for the incremental stream decoder.

use narwhal_client::{StreamDecoder, StreamDelta};

/// Feed chunks through a fresh decoder and accumulate the result.
fn decode_all(chunks: &[&str]) -> (String, String) {
    let mut decoder = StreamDecoder::new();
    let mut content = String::new();
    let mut reasoning = String::new();
    for chunk in chunks {
        for delta in decoder.push(chunk.as_bytes()) {
            content.push_str(&delta.content);
            reasoning.push_str(&delta.reasoning);
        }
    }
    if let Some(delta) = decoder.finish() {
        content.push_str(&delta.content);
        reasoning.push_str(&delta.reasoning);
    }
    (content, reasoning)
}

#[test]
fn ndjson_message_content() {
    let mut decoder = StreamDecoder::new();
    let deltas = decoder.push(b"{\"message\":{\"content\":\"Hi\"}}\n");
    assert_eq!(
        deltas,
        vec![StreamDelta {
            content: "Hi".into(),
            reasoning: String::new(),
        }]
    );
}

#[test]
fn sse_delta_content() {
    let (content, reasoning) =
        decode_all(&["data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n"]);
    assert_eq!(content, "Hello");
    assert_eq!(reasoning, "");
}

#[test]
fn sse_done_sentinel_ignored() {
    let (content, _) = decode_all(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        "data: [DONE]\n",
    ]);
    assert_eq!(content, "ok");
}

#[test]
fn ndjson_done_flag_emits_nothing() {
    let mut decoder = StreamDecoder::new();
    assert!(decoder.push(b"{\"done\":true}\n").is_empty());
}

#[test]
fn legacy_response_field() {
    let (content, reasoning) = decode_all(&["{\"response\":\"legacy\"}\n"]);
    assert_eq!(content, "legacy");
    assert_eq!(reasoning, "");
}

#[test]
fn content_precedence_prefers_delta() {
    let (content, _) = decode_all(&[
        "{\"choices\":[{\"delta\":{\"content\":\"delta\"}}],\"response\":\"legacy\"}\n",
    ]);
    assert_eq!(content, "delta");
}

#[test]
fn out_of_band_reasoning_field() {
    let (content, reasoning) =
        decode_all(&["data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"hmm\"}}]}\n"]);
    assert_eq!(content, "");
    assert_eq!(reasoning, "hmm");
}

#[test]
fn top_level_reasoning_field() {
    let (_, reasoning) = decode_all(&["{\"response\":\"a\",\"reasoning\":\"because\"}\n"]);
    assert_eq!(reasoning, "because");
}

#[test]
fn malformed_line_is_skipped() {
    let (content, _) = decode_all(&[
        "{\"message\":{\"content\":\"a\"}}\n",
        "{not json at all\n",
        "data: {broken\n",
        "{\"message\":{\"content\":\"b\"}}\n",
    ]);
    assert_eq!(content, "ab");
}

#[test]
fn non_json_noise_is_ignored() {
    let (content, _) = decode_all(&[
        "event: message\n",
        ": keepalive\n",
        "\n",
        "{\"message\":{\"content\":\"x\"}}\n",
    ]);
    assert_eq!(content, "x");
}

#[test]
fn partial_line_waits_for_newline() {
    let mut decoder = StreamDecoder::new();
    assert!(decoder.push(b"{\"message\":{\"con").is_empty());
    let deltas = decoder.push(b"tent\":\"Hi\"}}\n");
    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].content, "Hi");
}

#[test]
fn trailing_partial_line_discarded_at_end() {
    let mut decoder = StreamDecoder::new();
    decoder.push(b"{\"message\":{\"content\":\"done\"}}\n{\"message\":{\"content\":\"lost");
    assert!(decoder.finish().is_none());
}

#[test]
fn crlf_lines_are_handled() {
    let (content, _) = decode_all(&["data: {\"message\":{\"content\":\"Hi\"}}\r\n"]);
    assert_eq!(content, "Hi");
}

#[test]
fn think_span_in_one_line() {
    let (content, reasoning) =
        decode_all(&["{\"message\":{\"content\":\"<think>plan</think>answer\"}}\n"]);
    assert_eq!(content, "answer");
    assert_eq!(reasoning, "plan");
}

#[test]
fn think_span_across_sse_lines() {
    let (content, reasoning) = decode_all(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"<think>\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"plan</think>answer\"}}]}\n",
    ]);
    assert_eq!(content, "answer");
    assert_eq!(reasoning, "plan");
}

#[test]
fn think_marker_split_mid_tag_round_trips() {
    let whole = decode_all(&["{\"message\":{\"content\":\"<think>plan</think>answer\"}}\n"]);

    // The same span with both markers split across line boundaries.
    let split = decode_all(&[
        "{\"message\":{\"content\":\"<thi\"}}\n",
        "{\"message\":{\"content\":\"nk>plan</th\"}}\n",
        "{\"message\":{\"content\":\"ink>answer\"}}\n",
    ]);
    assert_eq!(split, whole);
    assert_eq!(split.0, "answer");
    assert_eq!(split.1, "plan");
}

#[test]
fn open_think_span_held_out_of_content() {
    let mut decoder = StreamDecoder::new();
    let deltas = decoder.push(b"{\"message\":{\"content\":\"<think>still going\"}}\n");
    let content: String = deltas.iter().map(|d| d.content.as_str()).collect();
    assert_eq!(content, "");

    // The interior surfaces as reasoning-so-far.
    let reasoning: String = deltas.iter().map(|d| d.reasoning.as_str()).collect();
    assert_eq!(reasoning, "still going");
}

#[test]
fn unclosed_think_span_flushes_as_reasoning() {
    let (content, reasoning) = decode_all(&["{\"message\":{\"content\":\"<think>forever\"}}\n"]);
    assert_eq!(content, "");
    assert_eq!(reasoning, "forever");
}

#[test]
fn incomplete_marker_flushes_as_content() {
    let (content, reasoning) = decode_all(&["{\"message\":{\"content\":\"a<thi\"}}\n"]);
    assert_eq!(content, "a<thi");
    assert_eq!(reasoning, "");
}

#[test]
fn multiple_think_spans() {
    let (content, reasoning) = decode_all(&[
        "{\"message\":{\"content\":\"<think>one</think>a<think>two</think>b\"}}\n",
    ]);
    assert_eq!(content, "ab");
    assert_eq!(reasoning, "onetwo");
}

#[test]
fn inline_and_out_of_band_reasoning_both_accumulate() {
    let (content, reasoning) = decode_all(&[
        "{\"choices\":[{\"delta\":{\"content\":\"<think>in</think>ok\",\"reasoning_content\":\"out\"}}]}\n",
    ]);
    assert_eq!(content, "ok");
    assert_eq!(reasoning, "outin");
}
