//! Live feed integration tests
//!
//! Runs `LiveFeed` against a local WebSocket server and `LiveMonitor` against scripted
//! event streams.
//!
//! # Test Coverage
//!
//! - The buffer never exceeds its capacity and keeps the newest samples in order
//! - Undecodable messages are skipped without disturbing the buffer
//! - Reconnects stop once the attempt budget is spent

use futures::{stream, SinkExt, StreamExt};
use scale_dash::config::LiveConfig;
use scale_dash::live::{ConnectionState, LiveEvent, LiveFeed, LiveMonitor, LiveSample};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

fn sample(i: i64) -> LiveSample {
    LiveSample {
        timestamp: 1_718_000_000_000 + i * 250,
        weight: 4000.0 + i as f64,
    }
}

fn local_config(url: String) -> LiveConfig {
    LiveConfig {
        url,
        capacity: 100,
        auto_reconnect: false,
        reconnect_delay_ms: 10,
        max_reconnect_attempts: 0,
    }
}

#[tokio::test]
async fn buffer_holds_latest_samples_in_arrival_order() {
    for (capacity, pushed) in [(1, 5), (10, 10), (100, 99), (100, 250)] {
        let mut monitor = LiveMonitor::new(capacity);
        let events = stream::iter((0..pushed).map(|i| LiveEvent::Sample(sample(i))));
        monitor.drive(events, None).await;

        let kept: Vec<LiveSample> = monitor.buffer().samples().copied().collect();
        let expected: Vec<LiveSample> = (pushed.saturating_sub(capacity as i64)..pushed)
            .map(sample)
            .collect();
        assert!(kept.len() <= capacity);
        assert_eq!(kept, expected, "capacity {capacity}, pushed {pushed}");
    }
}

#[tokio::test]
async fn drive_stops_after_requested_samples() {
    let mut monitor = LiveMonitor::new(100);
    let events = stream::iter(
        std::iter::once(LiveEvent::Connected).chain((0..50).map(|i| LiveEvent::Sample(sample(i)))),
    );

    monitor.drive(events, Some(20)).await;

    assert_eq!(monitor.buffer().len(), 20);
    assert_eq!(monitor.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn consumes_local_websocket_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        for i in 0..150 {
            let text = serde_json::to_string(&sample(i)).unwrap();
            ws.send(Message::Text(text.into())).await.unwrap();
        }
        ws.send(Message::Text("not json".to_string().into()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
        // Drain until the client acknowledges the close.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let mut feed = LiveFeed::new(local_config(format!("ws://{addr}/ws")));
    let mut monitor = LiveMonitor::new(100);
    monitor.drive(feed.subscribe(), None).await;
    server.await.unwrap();

    assert_eq!(monitor.buffer().len(), 100);
    assert_eq!(monitor.buffer().latest(), Some(&sample(149)));
    assert_eq!(monitor.buffer().start_time(), Some(sample(0).timestamp));
    assert_eq!(monitor.rejected(), 1);
    assert_eq!(monitor.state(), ConnectionState::Closed);

    let series = monitor.buffer().series();
    assert_eq!(series[0], [12.5, 4050.0]);
}

/// Address nothing is listening on.
async fn closed_port() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn connection_attempts(max_reconnect_attempts: u32) -> Vec<LiveEvent> {
    let mut config = local_config(format!("ws://{}/ws", closed_port().await));
    config.auto_reconnect = true;
    config.max_reconnect_attempts = max_reconnect_attempts;
    let mut feed = LiveFeed::new(config);
    feed.subscribe().collect().await
}

fn count_connecting(events: &[LiveEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, LiveEvent::Connecting { .. }))
        .count()
}

#[tokio::test]
async fn gives_up_after_reconnect_budget() {
    let events = connection_attempts(2).await;

    // First attempt plus two reconnects
    assert_eq!(count_connecting(&events), 3);
    match events.last() {
        Some(LiveEvent::Error { message }) => assert!(message.contains("Max reconnect attempts")),
        other => panic!("unexpected final event: {other:?}"),
    }
}

#[tokio::test]
async fn single_reconnect_budget_still_reconnects_once() {
    let events = connection_attempts(1).await;
    assert_eq!(count_connecting(&events), 2);
}

#[tokio::test]
async fn no_reconnect_without_auto_reconnect() {
    let mut feed = LiveFeed::new(local_config(format!("ws://{}/ws", closed_port().await)));
    let events: Vec<LiveEvent> = feed.subscribe().collect().await;

    assert_eq!(count_connecting(&events), 1);
    assert!(matches!(events.last(), Some(LiveEvent::Error { .. })));
}
