//! Client side against a mock server.

use futures::StreamExt;
use ui_message_stream::client::{detect_format, open_chunk_stream};
use ui_message_stream::error::{ErrorCategory, StreamError};
use ui_message_stream::reducer::{ReducerConfig, read_ui_message_stream};
use ui_message_stream::streaming::{PROTOCOL_HEADER, PROTOCOL_VERSION, WireFormat, merge};
use ui_message_stream::types::{MessageStatus, ToolState};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::stream_fixture::fixture_path;

#[tokio::test]
async fn lines_body_is_reduced_into_a_message() {
    let server = MockServer::start().await;
    let body = std::fs::read(fixture_path("simple_text.lines")).unwrap();
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain; charset=utf-8")
                .insert_header(PROTOCOL_HEADER, PROTOCOL_VERSION)
                .set_body_bytes(body),
        )
        .mount(&server)
        .await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", server.uri()))
        .send()
        .await
        .unwrap();
    let format = detect_format(&response);
    assert_eq!(format, WireFormat::Lines);

    let chunks = open_chunk_stream(response, format).await.unwrap();
    let snapshots: Vec<_> = read_ui_message_stream(merge([chunks]), ReducerConfig::default())
        .collect()
        .await;

    let last = snapshots.last().unwrap();
    assert_eq!(last.text(), "Hello");
    assert!(matches!(last.status, MessageStatus::Finished { .. }));
    // Every snapshot is renderable; the text only ever grows.
    let lengths: Vec<usize> = snapshots.iter().map(|m| m.text().len()).collect();
    assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn sse_body_with_tool_call() {
    let server = MockServer::start().await;
    let body = std::fs::read(fixture_path("tool_call.sse")).unwrap();
    Mock::given(method("GET"))
        .and(path("/api/chat/resume"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_bytes(body),
        )
        .mount(&server)
        .await;

    let response = reqwest::get(format!("{}/api/chat/resume", server.uri()))
        .await
        .unwrap();
    let format = detect_format(&response);
    let chunks = open_chunk_stream(response, format).await.unwrap();
    let message = read_ui_message_stream(merge([chunks]), ReducerConfig::default())
        .collect::<Vec<_>>()
        .await
        .pop()
        .unwrap();

    assert_eq!(message.id, "msg-2");
    assert_eq!(
        message.tool_part("tc1").unwrap().state,
        ToolState::OutputAvailable
    );
}

#[tokio::test]
async fn rejected_open_surfaces_before_any_chunk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-session-id", "gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such session"))
        .mount(&server)
        .await;

    let response = reqwest::Client::new()
        .get(server.uri())
        .header("x-session-id", "gone")
        .send()
        .await
        .unwrap();

    let Err(err) = open_chunk_stream(response, WireFormat::Sse).await else {
        panic!("404 must reject the open");
    };
    assert_eq!(err.category(), ErrorCategory::Transport);
    assert!(!err.is_retryable());
    match err {
        StreamError::Transport { status, message } => {
            assert_eq!(status, Some(404));
            assert_eq!(message, "no such session");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
