//! Integration tests for reconnection, clean disconnect and heartbeats
//!
//! All tests run on a paused clock and drive time with `advance`.

mod common;

use common::{count_kind, settle, Dial, MockConnector, ServerSide};
use realtime::{kinds, ChannelEvent, ConnectionState};
use std::time::Duration;
use tokio::time::advance;
use toasts::{ToastKind, ToastProvider};

const INTERVAL: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn test_reconnect_cap_escalates_exactly_once() {
    verbose_println!("Testing reconnect cap with maxReconnectAttempts=2...");

    let toasts = ToastProvider::current();
    let queue = toasts.queue();
    let (connector, mut servers) = MockConnector::new();
    connector.accept(1);

    let client = realtime::builder()
        .url("ws://mock.test/realtime")
        .connector(connector.clone())
        .reconnect_interval(INTERVAL)
        .max_reconnect_attempts(2)
        .heartbeat_interval(Duration::ZERO)
        .notifier(queue.clone())
        .build()
        .await
        .unwrap();
    let handle = client.handle();
    let events = handle.listen();

    client.connect();
    let server = servers.recv().await.unwrap();
    handle.wait_for(|s| s.is_connected()).await.unwrap();
    assert_eq!(connector.dials(), 1);

    // Unclean close #1: the only accepted connection drops
    server.drop_unclean();
    settle().await;
    assert_eq!(handle.status().state, ConnectionState::Reconnecting);
    assert_eq!(handle.status().reconnect_attempts, 1);
    assert!(handle.status().error.is_none());

    // Unclean close #2: first retry is refused
    advance(INTERVAL + Duration::from_millis(50)).await;
    settle().await;
    assert_eq!(connector.dials(), 2);
    assert_eq!(handle.status().reconnect_attempts, 2);
    assert!(queue.is_empty());

    // Unclean close #3: second retry is refused, the cap is reached
    advance(INTERVAL + Duration::from_millis(50)).await;
    settle().await;
    assert_eq!(connector.dials(), 3);

    let status = handle.status();
    assert_eq!(status.state, ConnectionState::Disconnected);
    let error = status.error.expect("terminal error must be set");
    assert!(error.contains("2 attempts"), "unexpected error: {}", error);

    let escalations: Vec<_> = queue
        .toasts()
        .into_iter()
        .filter(|t| t.kind() == ToastKind::Error)
        .collect();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].duration_ms(), 7000);

    // Nothing else happens until reconnect() is called
    advance(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(connector.dials(), 3);
    assert_eq!(queue.len(), 1);

    let events = events.drain();
    let reconnecting = events
        .iter()
        .filter(|e| matches!(e, ChannelEvent::Reconnecting { .. }))
        .count();
    let exhausted = events
        .iter()
        .filter(|e| matches!(e, ChannelEvent::ReconnectExhausted { attempts: 2, .. }))
        .count();
    assert_eq!(reconnecting, 2);
    assert_eq!(exhausted, 1);
    assert_eq!(handle.metrics().reconnect_attempts, 2);

    verbose_println!("  {} dials, error: {}", connector.dials(), error);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_exhaustion_resets_counter() {
    let (connector, mut servers) = MockConnector::new();
    connector.script([Dial::Refuse("down".into())]);

    let client = realtime::builder()
        .url("ws://mock.test/realtime")
        .connector(connector.clone())
        .reconnect_interval(INTERVAL)
        .max_reconnect_attempts(0)
        .heartbeat_interval(Duration::ZERO)
        .build()
        .await
        .unwrap();
    let handle = client.handle();

    client.connect();
    settle().await;
    assert_eq!(connector.dials(), 1);
    assert!(handle.status().error.is_some());
    assert_eq!(handle.status().state, ConnectionState::Disconnected);

    connector.accept(1);
    client.reconnect();
    let _server = servers.recv().await.unwrap();
    let status = handle.wait_for(|s| s.is_connected()).await.unwrap();

    assert_eq!(connector.dials(), 2);
    assert_eq!(status.reconnect_attempts, 0);
    assert!(status.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_clean_disconnect_suppresses_retry() {
    verbose_println!("Testing that disconnect() never schedules a reconnect...");

    let (connector, mut servers) = MockConnector::new();
    connector.accept(2);

    let client = realtime::builder()
        .url("ws://mock.test/realtime")
        .connector(connector.clone())
        .reconnect_interval(INTERVAL)
        .max_reconnect_attempts(5)
        .build()
        .await
        .unwrap();
    let handle = client.handle();

    // Disconnect while a retry is pending (attempt counter = 1)
    client.connect();
    let first = servers.recv().await.unwrap();
    handle.wait_for(|s| s.is_connected()).await.unwrap();
    first.drop_unclean();
    settle().await;
    assert_eq!(handle.status().reconnect_attempts, 1);

    client.disconnect();
    settle().await;
    advance(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(connector.dials(), 1);
    assert_eq!(handle.status().state, ConnectionState::Disconnected);

    // Disconnect while connected (attempt counter = 0)
    client.connect();
    let second = servers.recv().await.unwrap();
    handle.wait_for(|s| s.is_connected()).await.unwrap();

    client.disconnect();
    settle().await;
    assert_eq!(second.client_close_code(), Some(1000));

    // A late close event from the dropped connection goes nowhere
    second.drop_unclean();
    advance(Duration::from_secs(10)).await;
    settle().await;

    assert_eq!(connector.dials(), 2);
    assert_eq!(handle.status().state, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_server_normal_closure_is_clean() {
    let (connector, mut servers) = MockConnector::new();
    connector.accept(1);

    let client = realtime::builder()
        .url("ws://mock.test/realtime")
        .connector(connector.clone())
        .reconnect_interval(INTERVAL)
        .build()
        .await
        .unwrap();
    let handle = client.handle();

    client.connect();
    let server = servers.recv().await.unwrap();
    handle.wait_for(|s| s.is_connected()).await.unwrap();

    server.close_with(1000);
    settle().await;
    advance(Duration::from_secs(1)).await;
    settle().await;

    assert_eq!(connector.dials(), 1);
    assert_eq!(handle.status().state, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_server_going_away_is_unclean() {
    let (connector, mut servers) = MockConnector::new();
    connector.accept(2);

    let client = realtime::builder()
        .url("ws://mock.test/realtime")
        .connector(connector.clone())
        .reconnect_interval(INTERVAL)
        .build()
        .await
        .unwrap();
    let handle = client.handle();

    client.connect();
    let server = servers.recv().await.unwrap();
    handle.wait_for(|s| s.is_connected()).await.unwrap();

    server.close_with(1001);
    settle().await;
    advance(INTERVAL).await;
    settle().await;

    let _second = servers.recv().await.unwrap();
    handle.wait_for(|s| s.is_connected()).await.unwrap();
    assert_eq!(connector.dials(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_single_heartbeat_across_reconnects() {
    verbose_println!("Testing heartbeat uniqueness across reconnect cycles...");

    let heartbeat = Duration::from_millis(1000);
    let (connector, mut servers) = MockConnector::new();
    connector.accept(4);

    let client = realtime::builder()
        .url("ws://mock.test/realtime")
        .connector(connector.clone())
        .reconnect_interval(INTERVAL)
        .max_reconnect_attempts(5)
        .heartbeat_interval(heartbeat)
        .build()
        .await
        .unwrap();
    let handle = client.handle();

    client.connect();
    let mut server = servers.recv().await.unwrap();
    handle.wait_for(|s| s.is_connected()).await.unwrap();

    let mut previous: Vec<ServerSide> = Vec::new();

    for cycle in 0..4 {
        // No ping before a full period has elapsed
        advance(heartbeat - Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(count_kind(&server.received(), kinds::PING), 0, "cycle {}", cycle);

        // Exactly one ping per period afterwards
        advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(count_kind(&server.received(), kinds::PING), 1, "cycle {}", cycle);

        advance(heartbeat).await;
        settle().await;
        assert_eq!(count_kind(&server.received(), kinds::PING), 1, "cycle {}", cycle);

        // Old connections never see another ping
        for old in previous.iter_mut() {
            assert!(old.received().is_empty(), "stale heartbeat on cycle {}", cycle);
        }

        if cycle < 3 {
            server.drop_unclean();
            settle().await;
            advance(INTERVAL).await;
            settle().await;

            let next = servers.recv().await.unwrap();
            handle.wait_for(|s| s.is_connected()).await.unwrap();
            previous.push(std::mem::replace(&mut server, next));
        }

        verbose_println!("  cycle {}: one heartbeat", cycle);
    }

    assert_eq!(handle.metrics().heartbeats_sent, 8);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_stops_heartbeat() {
    let (connector, mut servers) = MockConnector::new();
    connector.accept(1);

    let client = realtime::builder()
        .url("ws://mock.test/realtime")
        .connector(connector.clone())
        .heartbeat_interval(Duration::from_millis(500))
        .build()
        .await
        .unwrap();
    let handle = client.handle();

    client.connect();
    let mut server = servers.recv().await.unwrap();
    handle.wait_for(|s| s.is_connected()).await.unwrap();

    client.disconnect();
    settle().await;
    advance(Duration::from_secs(5)).await;
    settle().await;

    assert_eq!(count_kind(&server.received(), kinds::PING), 0);
    assert_eq!(handle.metrics().heartbeats_sent, 0);
}
