//! Shared test utilities for integration tests.
//!
//! `MockServer` hands out an in-memory [`Connector`]; every successful
//! connect produces a [`MockSession`] the test drives from the server side.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch, Mutex};

use et_core::error::{EtError, EtResult};
use et_realtime::{
    ClientOptions, ConnectionState, Connector, EventType, Frame, HeartbeatConfig,
    RealtimeClient, ReconnectConfig, Transport, TransportEvent,
};

/// Generous bound so paused-clock tests can auto-advance through backoff.
pub const WAIT: Duration = Duration::from_secs(120);

/// Options with short timings suitable for tests.
pub fn test_options() -> ClientOptions {
    ClientOptions::new("ws://mock.test/ws")
        .with_reconnect(ReconnectConfig {
            base_interval: Duration::from_millis(100),
            max_attempts: 10,
            enabled: true,
        })
        .with_heartbeat(HeartbeatConfig {
            interval: Duration::from_secs(30),
            max_missed: 0,
        })
}

pub struct MockConnector {
    sessions: mpsc::UnboundedSender<MockSession>,
    refuse_next: AtomicUsize,
    attempts: AtomicUsize,
}

impl MockConnector {
    /// Refuse the next `n` connection attempts.
    pub fn refuse(&self, n: usize) {
        self.refuse_next.store(n, Ordering::SeqCst);
    }

    /// Connection attempts made so far, refused ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> EtResult<Box<dyn Transport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refuse_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(EtError::Socket("connection refused".into()));
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        self.sessions
            .send(MockSession {
                to_client,
                from_client,
            })
            .map_err(|_| EtError::Socket("mock server gone".into()))?;
        Ok(Box::new(MockTransport { inbound, outbound }))
    }
}

struct MockTransport {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&mut self, text: String) -> EtResult<()> {
        self.outbound
            .send(text)
            .map_err(|_| EtError::Socket("peer went away".into()))
    }

    async fn recv(&mut self) -> TransportEvent {
        self.inbound.recv().await.unwrap_or(TransportEvent::Closed {
            code: None,
            reason: "peer dropped".into(),
        })
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

/// Server side of one mock connection.
pub struct MockSession {
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MockSession {
    /// Next frame written by the client, pings included.
    pub async fn next_raw(&mut self) -> Frame {
        let text = tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("client transport dropped");
        Frame::decode(&text).expect("client wrote an invalid frame")
    }

    /// Next non-ping frame written by the client.
    pub async fn next_frame(&mut self) -> Frame {
        loop {
            let frame = self.next_raw().await;
            if frame.event_type != EventType::Ping {
                return frame;
            }
        }
    }

    /// Read `n` frames and return the channels of the subscribe frames among them.
    pub async fn subscribed_channels(&mut self, n: usize) -> Vec<String> {
        let mut channels = Vec::new();
        for _ in 0..n {
            let frame = self.next_frame().await;
            assert_eq!(frame.event_type, EventType::Subscribe, "unexpected {frame:?}");
            channels.push(frame.channel.expect("subscribe frame without channel"));
        }
        channels
    }

    /// Non-ping frame if one arrives within `within`.
    pub async fn try_next_frame(&mut self, within: Duration) -> Option<Frame> {
        tokio::time::timeout(within, self.next_frame()).await.ok()
    }

    pub fn send(&self, frame: Frame) {
        let text = frame.encode().expect("frame encodes");
        self.send_text(&text);
    }

    pub fn send_text(&self, text: &str) {
        let _ = self.to_client.send(TransportEvent::Text(text.to_string()));
    }

    pub fn auth_success(&self) {
        self.send(Frame::new(EventType::AuthSuccess, json!({ "session_id": "s-1" })));
    }

    pub fn event(&self, event_type: EventType, data: Value) {
        self.send(Frame::new(event_type, data));
    }

    pub fn channel_event(&self, event_type: EventType, channel: &str, data: Value) {
        self.send(Frame::new(event_type, data).with_channel(channel));
    }

    pub fn close(&self) {
        let _ = self.to_client.send(TransportEvent::Closed {
            code: Some(1000),
            reason: "bye".into(),
        });
    }

    pub fn fail(&self, reason: &str) {
        let _ = self.to_client.send(TransportEvent::Error(reason.to_string()));
    }

    /// Complete the handshake: read the auth frame, acknowledge it and return
    /// the auth frame for inspection.
    pub async fn handshake(&mut self) -> Frame {
        let auth = self.next_frame().await;
        assert_eq!(auth.event_type, EventType::Auth, "expected auth, got {auth:?}");
        self.auth_success();
        auth
    }
}

pub struct MockServer {
    pub connector: Arc<MockConnector>,
    sessions: Mutex<mpsc::UnboundedReceiver<MockSession>>,
}

impl MockServer {
    pub fn new() -> Self {
        et_core::logging::init_console_logging("warn");
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(MockConnector {
                sessions: tx,
                refuse_next: AtomicUsize::new(0),
                attempts: AtomicUsize::new(0),
            }),
            sessions: Mutex::new(rx),
        }
    }

    pub fn client(&self, options: ClientOptions) -> RealtimeClient {
        RealtimeClient::with_connector(options, self.connector.clone())
    }

    /// Wait for the client's next successful connection.
    pub async fn accept(&self) -> MockSession {
        tokio::time::timeout(WAIT, self.sessions.lock().await.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }
}

/// Wait until the client's state satisfies `pred`.
pub async fn wait_for_state(
    client: &RealtimeClient,
    pred: impl Fn(&ConnectionState) -> bool,
) -> ConnectionState {
    let mut rx: watch::Receiver<ConnectionState> = client.state_receiver();
    tokio::time::timeout(WAIT, async {
        loop {
            {
                let state = rx.borrow_and_update();
                if pred(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("timed out waiting for state")
}

/// Unbounded channel whose sender can be moved into handlers.
pub fn handler_channel<T: Send + 'static>(
) -> (mpsc::UnboundedSender<T>, mpsc::UnboundedReceiver<T>) {
    mpsc::unbounded_channel()
}

pub async fn recv_within<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for handler")
        .expect("handler channel closed")
}
