//! Fold properties checked over generated chunk sequences.

use proptest::prelude::*;
use serde_json::json;
use ui_message_stream::reducer::{MessageReducer, ReducerConfig, reduce};
use ui_message_stream::types::{ToolState, UiChunk};

use crate::support::mixed_chunks;

fn arb_span_chunk() -> impl Strategy<Value = UiChunk> {
    let id = prop::sample::select(vec!["a", "b"]);
    let text = "[a-z ]{0,6}";
    prop_oneof![
        id.clone().prop_map(|id| UiChunk::text_start(id)),
        (id.clone(), text).prop_map(|(id, t)| UiChunk::text_delta(id, t)),
        id.clone().prop_map(|id| UiChunk::text_end(id)),
        id.clone().prop_map(|id| UiChunk::reasoning_start(id)),
        (id.clone(), text).prop_map(|(id, t)| UiChunk::reasoning_delta(id, t)),
        id.prop_map(|id| UiChunk::reasoning_end(id)),
    ]
}

fn arb_tool_chunk() -> impl Strategy<Value = UiChunk> {
    let id = prop::sample::select(vec!["a", "b"]);
    prop_oneof![
        id.clone().prop_map(|id| UiChunk::tool_input_start(id, "search")),
        (id.clone(), "[{}\":a-z0-9]{0,5}").prop_map(|(id, t)| UiChunk::tool_input_delta(id, t)),
        id.clone().prop_map(|id| UiChunk::tool_call(id, "search", json!({"q": 1}))),
        id.clone().prop_map(|id| UiChunk::tool_result(id, json!("ok"))),
        id.prop_map(|id| UiChunk::tool_error(id, "failed")),
    ]
}

fn arb_message_chunk() -> impl Strategy<Value = UiChunk> {
    prop_oneof![
        Just(UiChunk::start()),
        Just(UiChunk::StartStep),
        Just(UiChunk::FinishStep),
        (0u8..3).prop_map(|n| UiChunk::data("progress", json!({"step": n}))),
        (0u8..3).prop_map(|n| UiChunk::MessageMetadata {
            message_metadata: json!({"n": n})
        }),
        Just(UiChunk::error("boom")),
        Just(UiChunk::abort()),
        Just(UiChunk::finish()),
    ]
}

fn arb_chunk() -> impl Strategy<Value = UiChunk> {
    prop_oneof![
        4 => arb_span_chunk(),
        3 => arb_tool_chunk(),
        1 => arb_message_chunk(),
    ]
}

fn tool_rank(state: ToolState) -> u8 {
    match state {
        ToolState::InputStreaming => 0,
        ToolState::InputAvailable => 1,
        ToolState::ApprovalRequested => 2,
        ToolState::ApprovalResponded => 3,
        ToolState::OutputAvailable | ToolState::OutputError | ToolState::OutputDenied => 4,
    }
}

proptest! {
    #[test]
    fn fold_is_deterministic(chunks in prop::collection::vec(arb_chunk(), 0..40)) {
        let config = ReducerConfig::default();
        prop_assert_eq!(reduce(&chunks, &config), reduce(&chunks, &config));
    }

    #[test]
    fn resuming_from_any_prefix_matches_full_fold(
        chunks in prop::collection::vec(arb_chunk(), 0..40),
        split in any::<prop::sample::Index>(),
    ) {
        let config = ReducerConfig::default();
        let at = split.index(chunks.len() + 1);

        let mut resumed = MessageReducer::from_state(reduce(&chunks[..at], &config), config.clone());
        resumed.feed_all(&chunks[at..]);

        prop_assert_eq!(resumed.into_state(), reduce(&chunks, &config));
    }

    #[test]
    fn text_is_independent_of_delta_splitting(pieces in prop::collection::vec(".{0,8}", 0..12)) {
        let mut chunks = vec![UiChunk::text_start("t")];
        chunks.extend(pieces.iter().map(|p| UiChunk::text_delta("t", p.as_str())));
        chunks.push(UiChunk::text_end("t"));

        let state = reduce(&chunks, &ReducerConfig::default());
        prop_assert_eq!(state.message().text(), pieces.concat());
    }

    #[test]
    fn tool_input_is_independent_of_delta_splitting(pieces in prop::collection::vec("[{}\":,a-z0-9]{0,6}", 0..10)) {
        let mut chunks = vec![UiChunk::tool_input_start("c", "search")];
        chunks.extend(pieces.iter().map(|p| UiChunk::tool_input_delta("c", p.as_str())));

        let state = reduce(&chunks, &ReducerConfig::default());
        let tool = state.message().tool_part("c").unwrap();
        prop_assert_eq!(&tool.input_text, &pieces.concat());
    }

    #[test]
    fn tool_states_never_regress(chunks in prop::collection::vec(arb_chunk(), 0..60)) {
        let config = ReducerConfig::default();
        let mut reducer = MessageReducer::new(config);
        let mut seen: std::collections::HashMap<String, ToolState> = Default::default();

        for chunk in &chunks {
            reducer.feed(chunk);
            for tool in reducer.message().tool_parts() {
                if let Some(previous) = seen.get(&tool.tool_call_id) {
                    prop_assert!(tool_rank(tool.state) >= tool_rank(*previous));
                    if previous.is_terminal() {
                        prop_assert_eq!(tool.state, *previous);
                    }
                }
                seen.insert(tool.tool_call_id.clone(), tool.state);
            }
        }
    }

    #[test]
    fn parts_are_only_appended(chunks in prop::collection::vec(arb_chunk(), 0..40)) {
        let config = ReducerConfig::default();
        let mut reducer = MessageReducer::new(config);
        let mut previous_len = 0;
        for chunk in &chunks {
            reducer.feed(chunk);
            let len = reducer.message().parts.len();
            prop_assert!(len >= previous_len);
            previous_len = len;
        }
    }
}

#[test]
fn mixed_stream_is_resumable_at_every_cursor() {
    let chunks = mixed_chunks();
    let config = ReducerConfig::default();
    let full = reduce(&chunks, &config);
    assert!(full.anomalies().is_empty());

    for at in 0..=chunks.len() {
        let mut resumed = MessageReducer::from_state(reduce(&chunks[..at], &config), config.clone());
        resumed.feed_all(&chunks[at..]);
        assert_eq!(resumed.state(), &full, "diverged when resuming at {at}");
    }
}
