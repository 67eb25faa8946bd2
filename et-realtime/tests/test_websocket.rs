//! End-to-end tests against a real WebSocket server on localhost.

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use common::{handler_channel, recv_within, test_options, wait_for_state, WAIT};
use et_realtime::events::LocationUpdate;
use et_realtime::{channels, ClientOptions, EventType, Frame, Identity, RealtimeClient, Role};

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("no connection")
        .unwrap();
    accept_async(stream).await.unwrap()
}

async fn read_frame(ws: &mut WebSocketStream<TcpStream>) -> Frame {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("no frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            let frame = Frame::decode(text.as_str()).unwrap();
            if frame.event_type != EventType::Ping {
                return frame;
            }
        }
    }
}

async fn write_frame(ws: &mut WebSocketStream<TcpStream>, frame: Frame) {
    ws.send(Message::text(frame.encode().unwrap())).await.unwrap();
}

#[tokio::test]
async fn broker_session_over_websocket() {
    let (listener, url) = listen().await;
    let options = test_options().with_connect_timeout(Duration::from_secs(5));
    let client = RealtimeClient::new(ClientOptions { url, ..options });

    let (tx, mut rx) = handler_channel();
    let _handle = client.on_channel(channels::load_tracking("L1"), move |frame| {
        let _ = tx.send(frame.payload::<LocationUpdate>().unwrap());
    });

    // The upgrade handshake needs both sides running.
    let (connected, mut ws) = tokio::join!(
        client.connect(Identity::new("u42", Role::Broker)),
        accept(&listener)
    );
    connected.unwrap();

    let auth = read_frame(&mut ws).await;
    assert_eq!(auth.event_type, EventType::Auth);
    assert_eq!(auth.data["userId"], "u42");
    assert_eq!(auth.data["role"], "BROKER");
    write_frame(&mut ws, Frame::new(EventType::AuthSuccess, json!({}))).await;

    let mut subscribed = Vec::new();
    for _ in 0..4 {
        let frame = read_frame(&mut ws).await;
        assert_eq!(frame.event_type, EventType::Subscribe);
        subscribed.push(frame.channel.unwrap());
    }
    subscribed.sort();
    assert_eq!(
        subscribed,
        vec!["marketplace", "system:announcements", "user-notifications:u42", "user:u42"]
    );
    wait_for_state(&client, |s| s.is_authenticated).await;

    write_frame(
        &mut ws,
        Frame::new(
            EventType::LocationUpdate,
            json!({ "load_id": "L1", "latitude": 32.78, "longitude": -96.8 }),
        )
        .with_channel(channels::load_tracking("L1")),
    )
    .await;

    let update = recv_within(&mut rx).await;
    assert_eq!(update.load_id.as_deref(), Some("L1"));
    assert_eq!(update.latitude, 32.78);

    client.disconnect().await;
    assert!(!client.is_connected());
}

#[tokio::test]
async fn server_close_triggers_reconnect_and_reauth() {
    let (listener, url) = listen().await;
    let client = RealtimeClient::new(ClientOptions {
        url,
        ..test_options()
    });
    let (connected, mut first) = tokio::join!(
        client.connect(Identity::new("d9", Role::Driver)),
        accept(&listener)
    );
    connected.unwrap();

    assert_eq!(read_frame(&mut first).await.event_type, EventType::Auth);
    first.close(None).await.unwrap();

    let mut second = accept(&listener).await;
    let auth = read_frame(&mut second).await;
    assert_eq!(auth.event_type, EventType::Auth);
    assert_eq!(auth.data["userId"], "d9");

    let state = wait_for_state(&client, |s| s.is_connected).await;
    assert_eq!(state.reconnect_attempts, 0);
    client.disconnect().await;
}

#[tokio::test]
async fn unreachable_server_is_reported() {
    let (listener, url) = listen().await;
    drop(listener);

    let mut options = test_options();
    options.url = url;
    options.reconnect.enabled = false;
    let client = RealtimeClient::new(options);

    let result = client.connect(Identity::new("u1", Role::Shipper)).await;
    assert!(result.is_err());
    let state = client.state();
    assert!(!state.is_connected);
    assert!(state.error.is_some());
}
