#![cfg(feature = "webhook")]

//! End-to-end webhook listener tests over a real socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use ferrogram_core::{Update, UpdateKind};
use ferrogram_transport::{UpdateSink, WebhookListener};

async fn start_listener() -> (String, mpsc::UnboundedReceiver<Update>, CancellationToken) {
    let listener = WebhookListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let url = format!("http://{}", listener.local_addr());

    let (tx, rx) = mpsc::unbounded_channel();
    let sink: UpdateSink = Arc::new(move |update| {
        let _ = tx.send(update);
    });
    let cancel = CancellationToken::new();
    tokio::spawn(listener.serve(sink, cancel.clone()));
    (url, rx, cancel)
}

#[tokio::test]
async fn pushed_update_reaches_the_sink() {
    let (url, mut rx, cancel) = start_listener().await;

    let body = r#"{
        "update_id": 77,
        "message": {
            "message_id": 1, "date": 0,
            "chat": {"id": 9, "type": "private"},
            "text": "hello"
        }
    }"#;
    let response = reqwest::Client::new()
        .post(&url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("post update");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let update = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("sink receives before timeout")
        .expect("sink open");
    assert_eq!(update.update_id, 77);
    assert_eq!(update.kind(), Some(UpdateKind::Message));

    cancel.cancel();
}

#[tokio::test]
async fn secret_path_segment_is_accepted() {
    let (url, mut rx, cancel) = start_listener().await;

    let body = r#"{
        "update_id": 5,
        "poll_answer": {
            "poll_id": "p",
            "user": {"id": 1, "first_name": "Ann"},
            "option_ids": [0]
        }
    }"#;
    let response = reqwest::Client::new()
        .post(format!("{url}/hooks/s3cret"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("post update");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let update = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("sink receives before timeout")
        .expect("sink open");
    assert_eq!(update.kind(), Some(UpdateKind::PollAnswer));

    cancel.cancel();
}

#[tokio::test]
async fn malformed_body_is_dropped_but_acknowledged() {
    let (url, mut rx, cancel) = start_listener().await;
    let client = reqwest::Client::new();

    // Acknowledged with 200 despite the drop: a non-2xx would make the
    // service redeliver the same broken body forever.
    let response = client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("post garbage");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(rx.try_recv().is_err());

    // The listener is still up: a well-formed push right after dispatches.
    let response = client
        .post(&url)
        .header("content-type", "application/json")
        .body(r#"{"update_id": 8, "poll": {"id": "p", "question": "?"}}"#)
        .send()
        .await
        .expect("post update");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let update = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("sink receives before timeout")
        .expect("sink open");
    assert_eq!(update.update_id, 8);

    cancel.cancel();
}

#[tokio::test]
async fn cancellation_stops_the_listener() {
    let listener = WebhookListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let sink: UpdateSink = Arc::new(|_| {});
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(listener.serve(sink, cancel.clone()));

    cancel.cancel();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("serve returns after cancellation")
        .expect("serve task joins");
}
