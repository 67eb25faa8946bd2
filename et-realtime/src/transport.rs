//! Transport seam between the supervisor and the network.
//!
//! The supervisor only needs to write text frames, read the next event and
//! close. [`WsConnector`](crate::ws::WsConnector) implements this over
//! WebSockets; tests substitute an in-memory connector.

use async_trait::async_trait;

use et_core::error::EtResult;

/// Something that happened on an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Text(String),
    /// The peer closed the connection or the stream ended.
    Closed { code: Option<u16>, reason: String },
    /// The connection failed.
    Error(String),
}

/// An open, bidirectional text-frame connection.
#[async_trait]
pub trait Transport: Send {
    /// Write one text frame.
    async fn send_text(&mut self, text: String) -> EtResult<()>;

    /// Wait for the next inbound event. Must be cancel-safe.
    async fn recv(&mut self) -> TransportEvent;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

/// Opens transports to a URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> EtResult<Box<dyn Transport>>;
}
