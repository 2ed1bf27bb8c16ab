//! Full round trip: forwarder -> Axum response -> reqwest -> reducer.

use axum::Router;
use axum::routing::post;
use futures::StreamExt;
use serde_json::json;
use ui_message_stream::client::{detect_format, open_chunk_stream};
use ui_message_stream::reducer::{ReducerConfig, reduce};
use ui_message_stream::server_adapters::StreamResponseOptions;
use ui_message_stream::server_adapters::axum::to_stream_response;
use ui_message_stream::streaming::{
    ForwarderConfig, PROTOCOL_HEADER, PROTOCOL_VERSION, WireFormat, create_ui_message_stream,
};
use ui_message_stream::types::{MessageStatus, ToolState, UiChunk};

use crate::support::tool_call_chunks;

async fn chat(format: WireFormat) -> axum::response::Response {
    let handle = create_ui_message_stream(ForwarderConfig::default(), |writer| async move {
        writer.write(UiChunk::start()).await?;
        writer
            .write(UiChunk::data("status", json!("calling tool")))
            .await?;
        for chunk in tool_call_chunks() {
            writer.write(chunk).await?;
        }
        writer.write(UiChunk::error("upstream key sk-123 rejected")).await
    });
    to_stream_response(
        handle.stream,
        StreamResponseOptions::production().with_format(format),
    )
}

async fn serve() -> String {
    let app = Router::new()
        .route("/lines", post(|| chat(WireFormat::Lines)))
        .route("/sse", post(|| chat(WireFormat::Sse)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn round_trip_in_both_framings() {
    let base = serve().await;

    for route in ["lines", "sse"] {
        let response = reqwest::Client::new()
            .post(format!("{base}/{route}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers()[PROTOCOL_HEADER], PROTOCOL_VERSION);

        let format = detect_format(&response);
        let chunks: Vec<UiChunk> = open_chunk_stream(response, format)
            .await
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await;
        let message = reduce(&chunks, &ReducerConfig::default()).into_message();

        assert_eq!(
            message.tool_part("tc1").unwrap().state,
            ToolState::OutputAvailable,
            "{route}"
        );
        assert_eq!(
            message.status,
            MessageStatus::Errored {
                error_text: "An error occurred.".into()
            },
            "{route}"
        );
    }
}
