//! Forwarder ordering, failure and cancellation behaviour.

use futures::{Stream, StreamExt};
use proptest::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ui_message_stream::error::StreamError;
use ui_message_stream::streaming::{ForwardSummary, ForwarderConfig, StreamForwarder, merge};
use ui_message_stream::types::UiChunk;

fn tagged(source: usize, seq: usize) -> UiChunk {
    UiChunk::data("item", json!({"source": source, "seq": seq}))
}

fn tag_of(chunk: &UiChunk) -> (usize, usize) {
    match chunk {
        UiChunk::Data { data, .. } => (
            data["source"].as_u64().unwrap() as usize,
            data["seq"].as_u64().unwrap() as usize,
        ),
        other => panic!("unexpected chunk {other:?}"),
    }
}

/// A source that yields to the scheduler between some items.
fn jittery_source(
    source: usize,
    len: usize,
    pauses: Vec<bool>,
) -> impl Stream<Item = Result<UiChunk, StreamError>> + Send + 'static {
    futures::stream::iter(0..len).then(move |seq| {
        let pause = pauses.get(seq).copied().unwrap_or(false);
        async move {
            if pause {
                tokio::task::yield_now().await;
            }
            Ok(tagged(source, seq))
        }
    })
}

proptest! {
    #[test]
    fn per_source_order_is_preserved(
        sources in prop::collection::vec(
            (0usize..12, prop::collection::vec(any::<bool>(), 12)),
            1..5,
        )
    ) {
        let lens: Vec<usize> = sources.iter().map(|(len, _)| *len).collect();
        let merged: Vec<UiChunk> = tokio_test::block_on(async {
            let streams = sources
                .into_iter()
                .enumerate()
                .map(|(idx, (len, pauses))| jittery_source(idx, len, pauses));
            merge(streams).collect().await
        });

        prop_assert_eq!(merged.len(), lens.iter().sum::<usize>());
        let mut next = vec![0usize; lens.len()];
        for chunk in &merged {
            let (source, seq) = tag_of(chunk);
            prop_assert_eq!(seq, next[source]);
            next[source] += 1;
        }
    }
}

#[tokio::test]
async fn ready_forward_first_items_precede_regular_sources() {
    let regular = futures::stream::iter((0..3).map(|seq| Ok(tagged(1, seq))));
    let first = jittery_source(0, 3, vec![false; 3]);

    let out: Vec<(usize, usize)> = StreamForwarder::new()
        .source(regular)
        .forward_first(first)
        .into_stream()
        .map(|chunk| tag_of(&chunk))
        .collect()
        .await;

    assert_eq!(out, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
}

#[tokio::test]
async fn pending_forward_first_source_lets_others_through() {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<UiChunk>();
    let status = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok(chunk), rx))
    });
    let model = futures::stream::iter(vec![Ok(UiChunk::text_start("a"))]);

    let mut stream = StreamForwarder::new()
        .forward_first(status)
        .source(model)
        .into_stream();

    assert_eq!(stream.next().await, Some(UiChunk::text_start("a")));
    tx.send(UiChunk::data("status", json!("done"))).unwrap();
    drop(tx);
    assert_eq!(
        stream.next().await,
        Some(UiChunk::data("status", json!("done")))
    );
    assert_eq!(stream.next().await, None);
}

#[tokio::test]
async fn source_failure_ends_stream_with_one_error() {
    let summaries = Arc::new(Mutex::new(Vec::<ForwardSummary>::new()));
    let sink = summaries.clone();
    let config = ForwarderConfig::default()
        .with_mask_errors(true)
        .with_on_finish(move |summary| sink.lock().unwrap().push(*summary));

    let failing = futures::stream::iter(vec![
        Ok(UiChunk::text_start("a")),
        Err(StreamError::source("database password leaked in message")),
    ]);
    let endless = futures::stream::repeat_with(|| Ok(UiChunk::StartStep));

    let out: Vec<UiChunk> = StreamForwarder::with_config(config)
        .forward_first(failing)
        .source(endless)
        .into_stream()
        .collect()
        .await;

    assert_eq!(
        out,
        vec![UiChunk::text_start("a"), UiChunk::error("An error occurred.")]
    );
    let summaries = summaries.lock().unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].errored);
    assert!(!summaries[0].aborted);
}

#[tokio::test]
async fn cancellation_stops_pending_sources() {
    let forwarder = StreamForwarder::with_config(ForwarderConfig::default().with_abort_reason("user"))
        .source(futures::stream::iter(vec![Ok(UiChunk::start())]).chain(futures::stream::pending()));
    let cancel = forwarder.cancel_handle();
    let mut stream = forwarder.into_stream();

    assert_eq!(stream.next().await, Some(UiChunk::start()));
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
    });

    let rest: Vec<UiChunk> = tokio::time::timeout(Duration::from_secs(5), stream.collect())
        .await
        .expect("cancellation ends the stream");
    assert_eq!(
        rest,
        vec![UiChunk::Abort {
            reason: Some("user".into())
        }]
    );
}
