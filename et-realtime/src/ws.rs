//! WebSocket transport built on tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use et_core::error::{EtError, EtResult};

use crate::transport::{Connector, Transport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens real WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> EtResult<Box<dyn Transport>> {
        debug!("opening websocket to {url}");
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| EtError::Socket(format!("connection to {url} failed: {e}")))?;
        debug!("websocket handshake complete (HTTP {})", response.status());
        Ok(Box::new(WsTransport { stream }))
    }
}

/// One open WebSocket connection.
pub struct WsTransport {
    stream: WsStream,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> EtResult<()> {
        trace!("ws -> {text}");
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| EtError::Socket(format!("websocket write failed: {e}")))
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!("ws <- {}", text.as_str());
                    return TransportEvent::Text(text.as_str().to_owned());
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return TransportEvent::Text(text),
                    Err(e) => warn!("dropping non-UTF-8 binary frame: {e}"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                        None => (None, "server closed connection".to_string()),
                    };
                    return TransportEvent::Closed { code, reason };
                }
                // Control frames are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => return TransportEvent::Error(format!("websocket error: {e}")),
                None => {
                    return TransportEvent::Closed {
                        code: None,
                        reason: "websocket stream ended".to_string(),
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("websocket close: {e}");
        }
    }
}
