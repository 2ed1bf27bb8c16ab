//! `create_ui_message_stream` backpressure and cancellation.

use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use ui_message_stream::error::StreamError;
use ui_message_stream::reducer::{ReducerConfig, ResponseMessageOptions, reduce};
use ui_message_stream::streaming::{ForwarderConfig, create_ui_message_stream};
use ui_message_stream::types::{MessageStatus, Role, UiChunk, UiMessage};

#[tokio::test]
async fn slow_consumer_suspends_writer() {
    let written = Arc::new(AtomicUsize::new(0));
    let counter = written.clone();

    let handle = create_ui_message_stream(
        ForwarderConfig::default().with_capacity(2),
        move |writer| async move {
            tokio::spawn(async move {
                for i in 0..10 {
                    if writer.write(UiChunk::data("n", json!(i))).await.is_err() {
                        break;
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
            Ok(())
        },
    );
    let mut stream = handle.stream;

    assert_eq!(stream.next().await, Some(UiChunk::data("n", json!(0))));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = written.load(Ordering::SeqCst);
    assert!(before <= 3, "writer ran ahead: {before} writes");

    let rest: Vec<UiChunk> = stream.collect().await;
    let expected: Vec<UiChunk> = (1..10).map(|i| UiChunk::data("n", json!(i))).collect();
    assert_eq!(rest, expected);
    assert_eq!(written.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn status_is_written_before_merged_model_output() {
    let handle = create_ui_message_stream(ForwarderConfig::default(), |writer| async move {
        writer.write(UiChunk::start()).await?;
        writer
            .write(UiChunk::data("status", json!("thinking")))
            .await?;
        writer
            .merge(futures::stream::iter(vec![
                Ok(UiChunk::text_start("t")),
                Ok(UiChunk::text_delta("t", "Hi")),
                Ok(UiChunk::text_end("t")),
            ]))
            .await
    });

    let chunks: Vec<UiChunk> = handle.stream.collect().await;
    assert_eq!(chunks[0], UiChunk::start());
    assert_eq!(chunks[1], UiChunk::data("status", json!("thinking")));
    assert_eq!(chunks.len(), 5);

    let message = reduce(&chunks, &ReducerConfig::default()).into_message();
    assert_eq!(message.text(), "Hi");
}

#[tokio::test]
async fn cancelled_stream_rejects_further_writes() {
    let (result_tx, result_rx) = tokio::sync::oneshot::channel();
    let handle = create_ui_message_stream(ForwarderConfig::default(), move |writer| async move {
        writer.write(UiChunk::start()).await?;
        let cancel = writer.cancel_handle();
        cancel.cancelled().await;
        let _ = result_tx.send(writer.is_cancelled());
        Ok(())
    });
    let cancel = handle.cancel.clone();
    let mut stream = handle.stream;

    assert_eq!(stream.next().await, Some(UiChunk::start()));
    cancel.cancel();
    let rest: Vec<UiChunk> = stream.collect().await;
    assert_eq!(rest, vec![UiChunk::abort()]);

    // The producer was dropped with the stream, so it never observed the
    // cancellation itself.
    assert!(result_rx.await.is_err());
}

#[tokio::test]
async fn producer_error_keeps_written_prefix() {
    let handle = create_ui_message_stream(ForwarderConfig::default(), |writer| async move {
        writer.write(UiChunk::text_start("a")).await?;
        writer.write(UiChunk::text_delta("a", "partial")).await?;
        Err(StreamError::source("model timed out"))
    });

    let chunks: Vec<UiChunk> = handle.stream.collect().await;
    let message = reduce(&chunks, &ReducerConfig::default()).into_message();

    assert_eq!(message.text(), "partial");
    assert_eq!(
        message.status,
        MessageStatus::Errored {
            error_text: "source error: model timed out".into()
        }
    );
}

#[tokio::test]
async fn response_message_is_reported_when_the_stream_ends() {
    let finished = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = finished.clone();
    let history = vec![UiMessage {
        id: "user-1".into(),
        role: Role::User,
        ..Default::default()
    }];

    let handle = create_ui_message_stream(ForwarderConfig::default(), |writer| async move {
        writer.write(UiChunk::start()).await?;
        writer.write(UiChunk::text_start("t")).await?;
        writer.write(UiChunk::text_delta("t", "Hello")).await?;
        writer.write(UiChunk::text_end("t")).await?;
        writer.write(UiChunk::finish()).await?;
        Ok(())
    })
    .with_response_message(
        ResponseMessageOptions::new()
            .with_message_id("resp-1")
            .with_original_messages(history)
            .with_on_finish(move |finish| sink.lock().unwrap().push(finish)),
    );

    let chunks: Vec<UiChunk> = handle.stream.collect().await;
    assert_eq!(chunks[0], UiChunk::start_with_id("resp-1"));

    let finished = finished.lock().unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].messages.len(), 2);
    assert_eq!(finished[0].response_message.id, "resp-1");
    assert_eq!(finished[0].response_message.text(), "Hello");
    assert!(!finished[0].is_aborted);
}

#[tokio::test]
async fn cancelled_stream_reports_an_aborted_response() {
    let finished = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = finished.clone();

    let handle = create_ui_message_stream(ForwarderConfig::default(), |writer| async move {
        writer.write(UiChunk::start()).await?;
        writer.write(UiChunk::text_start("t")).await?;
        writer.write(UiChunk::text_delta("t", "partial")).await?;
        futures::future::pending::<()>().await;
        Ok(())
    })
    .with_response_message(
        ResponseMessageOptions::new()
            .with_message_id("resp-2")
            .with_on_finish(move |finish| sink.lock().unwrap().push(finish)),
    );

    let cancel = handle.cancel.clone();
    let mut stream = handle.stream;
    for _ in 0..3 {
        stream.next().await.unwrap();
    }
    cancel.cancel();
    let rest: Vec<UiChunk> = stream.collect().await;
    assert_eq!(rest, vec![UiChunk::abort()]);

    let finished = finished.lock().unwrap();
    assert_eq!(finished.len(), 1);
    assert!(finished[0].is_aborted);
    assert_eq!(finished[0].response_message.text(), "partial");
}
