//! Connection lifecycle integration tests: connect, outbound ordering,
//! reconnection backoff, retry exhaustion and disconnect.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;

use common::{test_options, wait_for_state, MockServer};
use et_core::constants::RECONNECT_EXHAUSTED_MESSAGE;
use et_core::error::{EtError, EtResult};
use et_realtime::{
    ConnectionState, Connector, EventType, Frame, Identity, RealtimeClient, Role, Transport,
};

fn driver() -> Identity {
    Identity::new("u1", Role::Driver)
}

// ---- Connect ----

#[tokio::test]
async fn connect_resolves_after_auth_frame_is_written() {
    let server = MockServer::new();
    let client = server.client(test_options());

    client
        .connect(Identity::new("u7", Role::Carrier).with_company("c3"))
        .await
        .unwrap();

    let state = client.state();
    assert!(state.is_connected);
    assert!(!state.is_authenticated);
    assert_eq!(state.reconnect_attempts, 0);

    let mut session = server.accept().await;
    let auth = session.next_frame().await;
    assert_eq!(auth.event_type, EventType::Auth);
    assert_eq!(auth.data["userId"], "u7");
    assert_eq!(auth.data["role"], "CARRIER");
    assert_eq!(auth.data["companyId"], "c3");
}

#[tokio::test]
async fn connect_while_connected_does_not_open_a_second_connection() {
    let server = MockServer::new();
    let client = server.client(test_options());

    client.connect(driver()).await.unwrap();
    let _session = server.accept().await;

    let other = client.clone();
    other
        .connect(Identity::new("someone-else", Role::Admin))
        .await
        .unwrap();

    assert_eq!(server.connector.attempts(), 1);
    assert_eq!(client.identity().unwrap().user_id, "u1");
}

#[tokio::test]
async fn concurrent_connects_share_one_connection() {
    let server = MockServer::new();
    let client = server.client(test_options());

    let (a, b) = tokio::join!(client.connect(driver()), client.connect(driver()));
    a.unwrap();
    b.unwrap();
    assert_eq!(server.connector.attempts(), 1);
}

#[tokio::test]
async fn connect_failure_rejects_and_records_error() {
    let server = MockServer::new();
    server.connector.refuse(1);
    let mut options = test_options();
    options.reconnect.enabled = false;
    let client = server.client(options);

    let result = client.connect(driver()).await;
    assert!(matches!(result, Err(EtError::Socket(_))));

    let state = client.state();
    assert!(!state.is_connected);
    assert!(state.error.unwrap().contains("refused"));
}

struct HangingConnector;

#[async_trait]
impl Connector for HangingConnector {
    async fn connect(&self, _url: &str) -> EtResult<Box<dyn Transport>> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn connect_times_out() {
    let mut options = test_options().with_connect_timeout(Duration::from_secs(2));
    options.reconnect.enabled = false;
    let client = RealtimeClient::with_connector(options, Arc::new(HangingConnector));

    let started = Instant::now();
    let result = client.connect(driver()).await;

    assert!(matches!(result, Err(EtError::Timeout(_))));
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(client.state().error.unwrap().contains("timed out"));
}

// ---- Outbound queue ----

#[tokio::test]
async fn frames_sent_offline_flush_in_order_after_auth() {
    let server = MockServer::new();
    let client = server.client(test_options());

    for n in 0..3 {
        client.send(Frame::new(EventType::MessageReceived, json!({ "n": n })));
    }
    assert_eq!(client.queued_frames(), 3);

    client.connect(driver()).await.unwrap();
    let mut session = server.accept().await;

    assert_eq!(session.next_frame().await.event_type, EventType::Auth);
    for n in 0..3 {
        let frame = session.next_frame().await;
        assert_eq!(frame.event_type, EventType::MessageReceived);
        assert_eq!(frame.data["n"], n);
    }
    assert_eq!(client.queued_frames(), 0);
}

#[tokio::test]
async fn frames_sent_while_connected_keep_submission_order() {
    let server = MockServer::new();
    let client = server.client(test_options());
    client.connect(driver()).await.unwrap();
    let mut session = server.accept().await;
    session.next_frame().await;

    for n in 0..20 {
        client.send(Frame::new(EventType::StatsUpdate, json!({ "n": n })));
    }
    for n in 0..20 {
        assert_eq!(session.next_frame().await.data["n"], n);
    }
}

#[tokio::test]
async fn bounded_queue_keeps_newest_frames() {
    let server = MockServer::new();
    let client = server.client(test_options().with_queue_limit(2));

    for n in 0..5 {
        client.send(Frame::new(EventType::StatsUpdate, json!({ "n": n })));
    }
    assert_eq!(client.queued_frames(), 2);

    client.connect(driver()).await.unwrap();
    let mut session = server.accept().await;
    session.next_frame().await;
    assert_eq!(session.next_frame().await.data["n"], 3);
    assert_eq!(session.next_frame().await.data["n"], 4);
}

// ---- Reconnection ----

#[tokio::test(start_paused = true)]
async fn reconnects_after_close_and_resets_attempts() {
    let server = MockServer::new();
    let client = server.client(test_options());
    client.connect(driver()).await.unwrap();
    let first = server.accept().await;

    let closed_at = Instant::now();
    first.close();
    wait_for_state(&client, |s| !s.is_connected).await;

    let mut second = server.accept().await;
    let waited = closed_at.elapsed();
    assert!(waited >= Duration::from_millis(100), "reconnected after {waited:?}");
    assert!(waited < Duration::from_millis(150), "reconnected after {waited:?}");

    assert_eq!(second.next_frame().await.event_type, EventType::Auth);
    let state = wait_for_state(&client, |s| s.is_connected).await;
    assert_eq!(state.reconnect_attempts, 0);
    assert!(state.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn backoff_grows_by_half_each_attempt() {
    let server = MockServer::new();
    let client = server.client(test_options());
    client.connect(driver()).await.unwrap();
    let first = server.accept().await;

    let attempts_seen = Arc::new(Mutex::new(Vec::new()));
    let sink = attempts_seen.clone();
    let _observer = client.on_state_change(move |s: &ConnectionState| {
        sink.lock().unwrap().push(s.reconnect_attempts);
    });

    server.connector.refuse(2);
    let closed_at = Instant::now();
    first.fail("network unreachable");

    let _second = server.accept().await;
    // 100ms + 150ms + 225ms
    let waited = closed_at.elapsed();
    wait_for_state(&client, |s| s.is_connected).await;
    assert!(waited >= Duration::from_millis(475), "reconnected after {waited:?}");
    assert!(waited < Duration::from_millis(500), "reconnected after {waited:?}");
    assert_eq!(server.connector.attempts(), 4);

    let seen = attempts_seen.lock().unwrap().clone();
    assert!(seen.contains(&1) && seen.contains(&2) && seen.contains(&3), "{seen:?}");
    assert_eq!(seen.last(), Some(&0));
}

#[tokio::test(start_paused = true)]
async fn transport_error_is_recorded_in_state() {
    let server = MockServer::new();
    let mut options = test_options();
    options.reconnect.enabled = false;
    let client = server.client(options);
    client.connect(driver()).await.unwrap();
    let session = server.accept().await;

    session.fail("connection reset by peer");
    let state = wait_for_state(&client, |s| !s.is_connected).await;
    assert_eq!(state.error.as_deref(), Some("connection reset by peer"));
    assert!(!state.is_authenticated);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_stop_until_connect_is_called_again() {
    let server = MockServer::new();
    let mut options = test_options();
    options.reconnect.max_attempts = 3;
    let client = server.client(options);

    server.connector.refuse(usize::MAX);
    assert!(client.connect(driver()).await.is_err());

    let state = wait_for_state(&client, |s| {
        s.error.as_deref() == Some(RECONNECT_EXHAUSTED_MESSAGE)
    })
    .await;
    assert_eq!(state.reconnect_attempts, 3);
    assert_eq!(server.connector.attempts(), 4);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(server.connector.attempts(), 4);

    server.connector.refuse(0);
    client.connect(driver()).await.unwrap();
    let state = client.state();
    assert!(state.is_connected);
    assert_eq!(state.reconnect_attempts, 0);
    assert!(state.error.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connect_right_after_exhaustion_starts_a_new_supervisor() {
    let server = MockServer::new();
    let mut options = test_options();
    options.reconnect.base_interval = Duration::from_millis(1);
    options.reconnect.max_attempts = 1;
    let client = server.client(options);

    for round in 0..40 {
        client.connect(driver()).await.unwrap();
        let session = server.accept().await;

        server.connector.refuse(usize::MAX);
        session.close();
        wait_for_state(&client, |s| {
            s.error.as_deref() == Some(RECONNECT_EXHAUSTED_MESSAGE)
        })
        .await;

        server.connector.refuse(0);
        let reconnected = client.connect(driver()).await;
        assert!(reconnected.is_ok(), "round {round}: {reconnected:?}");
        assert!(client.is_connected(), "round {round}");

        let _next = server.accept().await;
        client.disconnect().await;
    }
}

#[tokio::test(start_paused = true)]
async fn connect_during_backoff_waits_for_next_open() {
    let server = MockServer::new();
    let client = server.client(test_options());
    client.connect(driver()).await.unwrap();
    let first = server.accept().await;

    first.close();
    wait_for_state(&client, |s| !s.is_connected).await;

    client
        .connect(Identity::new("u2", Role::Dispatch))
        .await
        .unwrap();
    assert!(client.is_connected());
    assert_eq!(server.connector.attempts(), 2);

    let mut second = server.accept().await;
    let auth = second.next_frame().await;
    assert_eq!(auth.data["userId"], "u2");
}

// ---- Disconnect ----

#[tokio::test(start_paused = true)]
async fn disconnect_stops_reconnection() {
    let server = MockServer::new();
    let client = server.client(test_options());
    client.connect(driver()).await.unwrap();
    let _session = server.accept().await;

    client.disconnect().await;
    let state = client.state();
    assert!(!state.is_connected);
    assert!(!state.is_authenticated);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(server.connector.attempts(), 1);
    assert_eq!(client.identity().unwrap().user_id, "u1");
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_backoff() {
    let server = MockServer::new();
    let mut options = test_options();
    options.reconnect.base_interval = Duration::from_secs(10);
    let client = server.client(options);

    server.connector.refuse(usize::MAX);
    assert!(client.connect(driver()).await.is_err());
    wait_for_state(&client, |s| s.reconnect_attempts == 1).await;

    client.disconnect().await;
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(server.connector.attempts(), 1);
    assert_eq!(client.state().reconnect_attempts, 0);
}

#[tokio::test]
async fn state_observer_is_called_immediately() {
    let server = MockServer::new();
    let client = server.client(test_options());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _observer = client.on_state_change(move |s: &ConnectionState| {
        sink.lock().unwrap().push(s.clone());
    });

    {
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ConnectionState::default());
    }

    client.connect(driver()).await.unwrap();
    let seen = seen.lock().unwrap();
    assert!(seen.iter().any(|s| s.is_connected));
    assert!(seen.iter().all(|s| !s.is_authenticated || s.is_connected));
}
