//! EusoTrip realtime client.
//!
//! A single persistent connection that multiplexes the marketplace's event
//! catalog and per-scope channels:
//! - connection supervision with exponential-backoff reconnection
//! - authentication handshake and role-based auto-subscription, replayed on
//!   every reconnect
//! - keep-alive pings with optional liveness timeout
//! - an ordered outbound queue for frames sent while offline
//! - dispatch to event-type, channel and catch-all listeners with per-handler
//!   isolation

pub mod auto_subscribe;
pub mod channels;
pub mod client;
pub mod dispatcher;
pub mod events;
pub mod frame;
pub mod heartbeat;
pub mod identity;
pub mod options;
pub mod queue;
pub mod reconnect;
pub mod registry;
pub mod state;
mod supervisor;
pub mod transport;
pub mod ws;

pub use auto_subscribe::subscription_plan;
pub use client::RealtimeClient;
pub use dispatcher::{DispatchReport, Dispatcher};
pub use events::{EventCategory, EventType, TypedEvent};
pub use frame::Frame;
pub use heartbeat::HeartbeatConfig;
pub use identity::{Identity, Role};
pub use options::ClientOptions;
pub use reconnect::ReconnectConfig;
pub use registry::{ListenerRegistry, Unsubscribe};
pub use state::{ConnectionState, StatePatch};
pub use transport::{Connector, Transport, TransportEvent};
pub use ws::WsConnector;
