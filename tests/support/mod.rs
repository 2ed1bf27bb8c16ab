#![allow(dead_code)]

pub mod stream_fixture;

use serde_json::json;
use ui_message_stream::types::UiChunk;

/// `[start, start-step, text(a: "Hel" + "lo"), finish-step, finish]`
pub fn simple_text_chunks() -> Vec<UiChunk> {
    vec![
        UiChunk::start(),
        UiChunk::StartStep,
        UiChunk::text_start("a"),
        UiChunk::text_delta("a", "Hel"),
        UiChunk::text_delta("a", "lo"),
        UiChunk::text_end("a"),
        UiChunk::FinishStep,
        UiChunk::finish(),
    ]
}

/// Weather tool call streamed in two input deltas, then answered.
pub fn tool_call_chunks() -> Vec<UiChunk> {
    vec![
        UiChunk::tool_input_start("tc1", "weather"),
        UiChunk::tool_input_delta("tc1", "{\"city\":"),
        UiChunk::tool_input_delta("tc1", "\"NYC\"}"),
        UiChunk::tool_call("tc1", "weather", json!({"city": "NYC"})),
        UiChunk::tool_result("tc1", json!({"temp": 72})),
    ]
}

/// Shell tool call whose approval is denied.
pub fn denied_approval_chunks() -> Vec<UiChunk> {
    vec![
        UiChunk::tool_input_start("tc1", "shell"),
        UiChunk::tool_call("tc1", "shell", json!({"cmd": "rm"})),
        UiChunk::tool_approval_request("ap1", "tc1"),
        UiChunk::tool_approval_response("ap1", false),
        UiChunk::tool_output_denied("tc1"),
    ]
}

/// A realistic mixed stream: reasoning, text, a tool round trip, data and
/// metadata.
pub fn mixed_chunks() -> Vec<UiChunk> {
    let mut chunks = vec![
        UiChunk::start(),
        UiChunk::StartStep,
        UiChunk::reasoning_start("r"),
        UiChunk::reasoning_delta("r", "Looking up "),
        UiChunk::reasoning_delta("r", "the weather."),
        UiChunk::reasoning_end("r"),
    ];
    chunks.extend(tool_call_chunks());
    chunks.extend([
        UiChunk::FinishStep,
        UiChunk::StartStep,
        UiChunk::data("status", json!({"phase": "answering"})),
        UiChunk::text_start("t"),
        UiChunk::text_delta("t", "It is "),
        UiChunk::text_delta("t", "72°F in "),
        UiChunk::text_delta("t", "New York."),
        UiChunk::text_end("t"),
        UiChunk::MessageMetadata {
            message_metadata: json!({"usage": {"outputTokens": 12}}),
        },
        UiChunk::FinishStep,
        UiChunk::finish(),
    ]);
    chunks
}
