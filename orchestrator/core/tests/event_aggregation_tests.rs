// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Live event feed: SSE transport → Event Ingest → Aggregation Engine.

use aurora_console_core::application::{AggregationEngine, EventIngest};
use aurora_console_core::console_config::EventsConfig;
use aurora_console_core::events::{EventEnvelope, Notification, NotificationHandle, NotificationSink, NotificationTone};
use aurora_console_core::infrastructure::{AuroraApi, HttpEventSource};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sink keeping the latest content of every notification on display.
#[derive(Clone, Default)]
struct Board {
    shown: Arc<Mutex<BTreeMap<NotificationHandle, Notification>>>,
    next: u64,
}

impl NotificationSink for Board {
    fn show(&mut self, notification: &Notification) -> NotificationHandle {
        self.next += 1;
        let handle = NotificationHandle(self.next);
        self.shown.lock().insert(handle, notification.clone());
        handle
    }

    fn update(&mut self, handle: NotificationHandle, notification: &Notification) {
        self.shown.lock().insert(handle, notification.clone());
    }

    fn dismiss(&mut self, handle: NotificationHandle) {
        self.shown.lock().remove(&handle);
    }
}

#[tokio::test]
async fn test_burst_from_stream_collapses() {
    let mut server = mockito::Server::new_async().await;
    let frame = r#"{"type":"exec","tool":"mailTool","intent":"send summary","outcome":"error"}"#;
    let body = format!(
        ": connected\n\n\
         event: ping\ndata: {{}}\n\n\
         data: {frame}\n\n\
         data: {frame}\n\n\
         data: not-json\n\n\
         data: {frame}\n\n\
         data: {{\"type\":\"policy\",\"tool\":\"fs\",\"outcome\":\"blocked\"}}\n\n"
    );
    let _m = server
        .mock("GET", "/events/stream")
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let board = Board::default();
    let mut engine = AggregationEngine::new(&EventsConfig::default(), Box::new(board.clone()));
    let source = HttpEventSource::new(
        AuroraApi::new(server.url()).unwrap(),
        "/events/stream",
        Duration::from_secs(60),
    );
    let ingest = EventIngest::new(Arc::new(source));

    // The source keeps the subscription open; stop once the body is drained.
    let cancel = CancellationToken::new();
    let stopper = {
        let cancel = cancel.clone();
        let shown = board.shown.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                if shown.lock().values().any(|n| n.title == "policy · fs") {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            cancel.cancel();
        })
    };

    let stats = ingest.run(&mut engine, cancel).await.unwrap();
    stopper.await.unwrap();

    assert_eq!(stats.delivered, 4);
    assert_eq!(stats.dropped, 1);

    let shown = board.shown.lock();
    assert_eq!(shown.len(), 2);

    let mail = shown.values().find(|n| n.title == "exec · mailTool").unwrap();
    assert_eq!(mail.count, 3);
    assert_eq!(mail.description, "send summary • error (x3)");
    assert_eq!(mail.tone, NotificationTone::Error);

    let policy = shown.values().find(|n| n.title == "policy · fs").unwrap();
    assert_eq!(policy.count, 1);
    assert_eq!(policy.tone, NotificationTone::Warning);
    assert_eq!(policy.description, "(no-intent) • blocked");
}

#[tokio::test]
async fn test_bursts_across_windows() {
    let board = Board::default();
    let mut engine = AggregationEngine::new(&EventsConfig::default(), Box::new(board.clone()));
    let t0 = tokio::time::Instant::now();
    let event = EventEnvelope::new("exec").with_tool("mailTool").with_outcome("error");

    engine.ingest(&event, t0);
    engine.ingest(&event, t0 + Duration::from_millis(500));
    engine.ingest(&event, t0 + Duration::from_millis(2600));

    let counts: Vec<u32> = board.shown.lock().values().map(|n| n.count).collect();
    assert_eq!(counts, vec![2, 1]);

    // First notification leaves at 5000, the second at 7600.
    engine.expire(t0 + Duration::from_millis(5000));
    assert_eq!(board.shown.lock().len(), 1);
    engine.expire(t0 + Duration::from_millis(7600));
    assert!(board.shown.lock().is_empty());
}
