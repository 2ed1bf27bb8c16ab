//! A client that disconnects mid-stream and resumes must end up with the
//! same message as one that never disconnected.

use futures::StreamExt;
use std::time::Duration;
use ui_message_stream::reducer::{MessageReducer, ReducerConfig, reduce};
use ui_message_stream::session::{ResumableStreams, SessionConfig};
use ui_message_stream::streaming::{ForwarderConfig, create_ui_message_stream};
use ui_message_stream::types::{MessageStatus, UiChunk};
use ui_message_stream::InMemoryChunkStore;

use crate::support::mixed_chunks;

#[tokio::test]
async fn resume_from_last_cursor_rebuilds_the_same_message() {
    let streams: ResumableStreams = ResumableStreams::default();
    let chunks = mixed_chunks();
    let appended = streams
        .pipe("chat-1", futures::stream::iter(chunks.clone()))
        .await
        .unwrap();
    assert_eq!(appended, chunks.len() as u64);

    let config = ReducerConfig::default();
    let full = reduce(&chunks, &config);

    for disconnect_at in [0usize, 1, 7, chunks.len() - 1] {
        // First connection: read `disconnect_at` chunks, then drop.
        let mut first = streams.subscribe_with_cursor("chat-1", 0);
        let mut reducer = MessageReducer::new(config.clone());
        let mut last_cursor = None;
        for _ in 0..disconnect_at {
            let (cursor, chunk) = first.next().await.unwrap().unwrap();
            reducer.feed(&chunk);
            last_cursor = Some(cursor);
        }
        drop(first);

        // Second connection continues after the last seen cursor.
        let from = last_cursor.map_or(0, |c| c + 1);
        let replayed: Vec<UiChunk> = streams
            .subscribe("chat-1", from)
            .map(|item| item.unwrap())
            .collect()
            .await;
        reducer.feed_all(&replayed);

        assert_eq!(reducer.state(), &full, "disconnect at {disconnect_at}");
    }
}

#[tokio::test]
async fn subscribers_follow_the_live_tail() {
    let streams: ResumableStreams = ResumableStreams::default();
    let mut handle = streams.open("live").await.unwrap();

    let early = streams.subscribe("live", 0);
    streams.append(&mut handle, UiChunk::start()).await.unwrap();
    streams.append(&mut handle, UiChunk::text_start("t")).await.unwrap();
    let late = streams.subscribe("live", 0);

    let writer = {
        let streams = streams.clone();
        tokio::spawn(async move {
            for word in ["a", "b", "c"] {
                tokio::time::sleep(Duration::from_millis(5)).await;
                streams
                    .append(&mut handle, UiChunk::text_delta("t", word))
                    .await
                    .unwrap();
            }
            streams.append(&mut handle, UiChunk::text_end("t")).await.unwrap();
            streams.append(&mut handle, UiChunk::finish()).await.unwrap();
        })
    };

    let (early, late) = tokio::time::timeout(Duration::from_secs(5), async {
        futures::join!(early.collect::<Vec<_>>(), late.collect::<Vec<_>>())
    })
    .await
    .expect("subscribers end when the session completes");
    writer.await.unwrap();

    let early: Vec<UiChunk> = early.into_iter().map(Result::unwrap).collect();
    let late: Vec<UiChunk> = late.into_iter().map(Result::unwrap).collect();
    assert_eq!(early.len(), 7);
    assert_eq!(early, late);
    assert_eq!(reduce(&early, &ReducerConfig::default()).message().text(), "abc");
}

#[tokio::test]
async fn forwarder_output_can_be_piped_into_a_session() {
    let streams = ResumableStreams::with_config(
        InMemoryChunkStore::new(),
        SessionConfig::default().with_max_chunks(Some(100)),
    );
    let handle = create_ui_message_stream(ForwarderConfig::default(), |writer| async move {
        for chunk in mixed_chunks() {
            writer.write(chunk).await?;
        }
        Ok(())
    });

    let count = streams.pipe("piped", handle.stream).await.unwrap();
    assert_eq!(count, mixed_chunks().len() as u64);

    let info = streams.sessions().await.unwrap();
    assert_eq!(info.len(), 1);
    assert!(info[0].complete);

    let replayed: Vec<UiChunk> = streams
        .subscribe("piped", 0)
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(replayed, mixed_chunks());
}

#[tokio::test]
async fn live_subscribers_end_when_the_writer_overflows() {
    let streams = ResumableStreams::with_config(
        InMemoryChunkStore::new(),
        SessionConfig::default().with_max_chunks(Some(3)),
    );
    let (tx, rx) = futures::channel::mpsc::unbounded();
    let writer = {
        let streams = streams.clone();
        tokio::spawn(async move { streams.pipe("overflow", rx).await })
    };

    tx.unbounded_send(UiChunk::start()).unwrap();
    while streams.sessions().await.unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    let live = streams.subscribe("overflow", 0);

    for chunk in [
        UiChunk::text_start("t"),
        UiChunk::text_delta("t", "one "),
        UiChunk::text_delta("t", "two"),
        UiChunk::text_end("t"),
    ] {
        let _ = tx.unbounded_send(chunk);
    }

    let received = tokio::time::timeout(Duration::from_secs(5), live.collect::<Vec<_>>())
        .await
        .expect("subscriber ends after the writer fails");
    assert!(writer.await.unwrap().is_err());

    let received: Vec<UiChunk> = received.into_iter().map(Result::unwrap).collect();
    assert_eq!(received.len(), 4);
    let message = reduce(&received, &ReducerConfig::default()).into_message();
    assert_eq!(message.text(), "one ");
    assert!(matches!(message.status, MessageStatus::Errored { .. }));
    assert!(streams.sessions().await.unwrap()[0].complete);
}
