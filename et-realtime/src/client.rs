//! Public realtime client.
//!
//! One [`RealtimeClient`] owns one physical connection. It is cheap to clone;
//! every clone talks to the same supervisor task, listener tables and
//! outbound queue, so it can be handed to as many consumers as needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use et_core::constants;
use et_core::error::{EtError, EtResult};

use crate::dispatcher::Dispatcher;
use crate::events::{EventType, TypedEvent};
use crate::frame::Frame;
use crate::identity::Identity;
use crate::options::ClientOptions;
use crate::queue::OutboundQueue;
use crate::registry::{ListenerRegistry, Unsubscribe};
use crate::state::{ConnectionState, StateHub, StatePatch};
use crate::supervisor::{self, Command};
use crate::transport::Connector;
use crate::ws::WsConnector;

/// How long `disconnect` waits for the supervisor before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// State shared between client handles and the supervisor task.
pub(crate) struct Shared {
    pub(crate) options: ClientOptions,
    pub(crate) registry: ListenerRegistry,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) state: StateHub,
    outbound: Mutex<OutboundQueue>,
    identity: RwLock<Option<Identity>>,
    /// Channels the caller asked for with `subscribe`.
    requested: Mutex<Vec<String>>,
    /// Channels currently subscribed on the wire.
    active: Mutex<Vec<String>>,
    /// Wakes the supervisor when frames are queued.
    pub(crate) flush: Notify,
}

impl Shared {
    fn new(options: ClientOptions) -> Self {
        let registry = ListenerRegistry::new();
        Self {
            outbound: Mutex::new(OutboundQueue::new(options.outbound_queue_limit)),
            dispatcher: Dispatcher::new(registry.clone()),
            registry,
            options,
            state: StateHub::new(),
            identity: RwLock::new(None),
            requested: Mutex::new(Vec::new()),
            active: Mutex::new(Vec::new()),
            flush: Notify::new(),
        }
    }

    pub(crate) fn enqueue(&self, frame: Frame) {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame);
        self.flush.notify_one();
    }

    pub(crate) fn next_outbound(&self) -> Option<Frame> {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub(crate) fn requeue_front(&self, frame: Frame) {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_front(frame);
    }

    fn queued(&self) -> usize {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn dropped(&self) -> u64 {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dropped()
    }

    pub(crate) fn identity(&self) -> Option<Identity> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_identity(&self, identity: Identity) {
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    pub(crate) fn requested_channels(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add_requested(&self, channel: &str) {
        let mut requested = self.requested.lock().unwrap_or_else(PoisonError::into_inner);
        if !requested.iter().any(|c| c == channel) {
            requested.push(channel.to_string());
        }
    }

    fn remove_requested(&self, channel: &str) {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|c| c != channel);
    }

    pub(crate) fn set_active(&self, channels: Vec<String>) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = channels;
    }

    fn add_active(&self, channel: &str) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.iter().any(|c| c == channel) {
            active.push(channel.to_string());
        }
    }

    fn remove_active(&self, channel: &str) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|c| c != channel);
    }

    fn active_channels(&self) -> Vec<String> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

struct SupervisorHandle {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
    retired: Arc<AtomicBool>,
}

impl SupervisorHandle {
    /// Whether the task will still open a transport.
    fn is_live(&self) -> bool {
        !self.task.is_finished() && !self.retired.load(Ordering::Acquire)
    }
}

/// Realtime event client.
///
/// Keeps a single connection alive across network interruptions, replays
/// authentication and channel subscriptions after every reconnect, and fans
/// inbound frames out to locally registered handlers.
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    supervisor: Arc<tokio::sync::Mutex<Option<SupervisorHandle>>>,
}

impl RealtimeClient {
    /// Client that connects over WebSockets.
    pub fn new(options: ClientOptions) -> Self {
        Self::with_connector(options, Arc::new(WsConnector))
    }

    /// Client that opens transports through the given connector.
    pub fn with_connector(options: ClientOptions, connector: Arc<dyn Connector>) -> Self {
        Self {
            shared: Arc::new(Shared::new(options)),
            connector,
            supervisor: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Open the connection and authenticate as `identity`.
    ///
    /// Resolves once the transport is open and the authentication frame has
    /// been written. If the client is already connected this returns
    /// immediately and the stored identity is kept. If a reconnect is in
    /// progress, the identity is replaced and the call waits for the next
    /// successful open. A supervisor that has given up is replaced by a
    /// fresh one with a new attempt budget.
    pub async fn connect(&self, identity: Identity) -> EtResult<()> {
        let mut retrying = false;
        loop {
            let mut slot = self.supervisor.lock().await;
            if retrying && slot.is_none() {
                // `disconnect` won the race.
                return Err(EtError::SocketDisconnected);
            }

            if let Some(handle) = slot.as_ref().filter(|h| h.is_live()) {
                if self.shared.state.current().is_connected {
                    debug!("already connected, ignoring connect for {identity}");
                    return Ok(());
                }

                self.shared.set_identity(identity.clone());
                let (tx, rx) = oneshot::channel();
                if handle.commands.send(Command::AwaitOpen(tx)).await.is_ok() {
                    drop(slot);
                    match rx.await {
                        Ok(outcome) => return outcome,
                        Err(_) => {
                            debug!("supervisor stopped before the next open, retrying connect");
                            retrying = true;
                            continue;
                        }
                    }
                }
            }

            info!("connecting to {} as {identity}", self.shared.options.url);
            self.shared.set_identity(identity);
            self.shared
                .state
                .apply(StatePatch::new().attempts(0).clear_error());

            let (cmd_tx, cmd_rx) = mpsc::channel(constants::COMMAND_CHANNEL_CAPACITY);
            let (ready_tx, ready_rx) = oneshot::channel();
            let retired = Arc::new(AtomicBool::new(false));
            let task = tokio::spawn(supervisor::run(
                self.shared.clone(),
                self.connector.clone(),
                cmd_rx,
                ready_tx,
                retired.clone(),
            ));
            *slot = Some(SupervisorHandle {
                commands: cmd_tx,
                task,
                retired,
            });
            drop(slot);

            return ready_rx.await.unwrap_or(Err(EtError::SocketDisconnected));
        }
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Listener registrations, the stored identity and queued frames are kept;
    /// a later `connect` picks up where this left off.
    pub async fn disconnect(&self) {
        let handle = self.supervisor.lock().await.take();
        if let Some(SupervisorHandle { commands, mut task, .. }) = handle {
            let _ = commands.send(Command::Shutdown).await;
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("supervisor did not stop within {SHUTDOWN_GRACE:?}, aborting");
                task.abort();
            }
        }
        self.shared
            .state
            .apply(StatePatch::new().connected(false).attempts(0));
        info!("realtime client disconnected");
    }

    /// Queue a frame for delivery. Frames go out in submission order as soon
    /// as the transport is open.
    pub fn send(&self, frame: Frame) {
        debug!("queueing '{}' frame", frame.event_type);
        self.shared.enqueue(frame);
    }

    /// Ask the server for a channel's traffic.
    ///
    /// The channel is re-requested after every reconnect until
    /// [`unsubscribe`](Self::unsubscribe) is called. Every call emits a frame.
    pub fn subscribe(&self, channel: impl Into<String>) {
        let channel = channel.into();
        self.shared.add_requested(&channel);
        self.shared.add_active(&channel);
        self.send(Frame::subscribe(channel));
    }

    /// Stop receiving a channel and drop every local handler registered for it.
    pub fn unsubscribe(&self, channel: &str) {
        self.shared.remove_requested(channel);
        self.shared.remove_active(channel);
        let removed = self.shared.registry.clear_channel(channel);
        if removed > 0 {
            debug!("removed {removed} handler(s) for channel '{channel}'");
        }
        self.send(Frame::unsubscribe(channel));
    }

    /// Register a handler for an event type; it receives the frame's `data`.
    pub fn on<F>(&self, event_type: EventType, handler: F) -> Unsubscribe
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared.registry.on(event_type, Arc::new(handler))
    }

    /// Register a handler that receives the decoded payload of `E`.
    ///
    /// Frames whose payload does not decode are logged and skipped.
    pub fn on_typed<E, F>(&self, handler: F) -> Unsubscribe
    where
        E: TypedEvent,
        F: Fn(E) + Send + Sync + 'static,
    {
        let event_type = E::event_type();
        let label = event_type.clone();
        self.on(event_type, move |data| {
            match serde_json::from_value::<E>(data.clone()) {
                Ok(payload) => handler(payload),
                Err(e) => warn!("'{label}' payload did not decode: {e}"),
            }
        })
    }

    /// Register a handler that receives every inbound frame, including event
    /// names the catalog does not know. It runs after the event-type and
    /// channel handlers.
    pub fn on_any<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        self.shared.registry.on_any(Arc::new(handler))
    }

    /// Register a handler for frames tagged with `channel`.
    ///
    /// Frames only arrive for channels the server was asked for, either by
    /// the role-based auto-subscription or by [`subscribe`](Self::subscribe).
    pub fn on_channel<F>(&self, channel: impl Into<String>, handler: F) -> Unsubscribe
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        self.shared.registry.on_channel(channel, Arc::new(handler))
    }

    /// Observe connection state. Called at once with the current snapshot,
    /// then on every transition.
    pub fn on_state_change<F>(&self, observer: F) -> Unsubscribe
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.shared.state.on_change(Arc::new(observer))
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.current()
    }

    /// Watch channel mirroring every state transition.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.receiver()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state.current().is_connected
    }

    pub fn is_authenticated(&self) -> bool {
        self.shared.state.current().is_authenticated
    }

    /// Identity given to the last `connect`.
    pub fn identity(&self) -> Option<Identity> {
        self.shared.identity()
    }

    /// Channels subscribed on the wire and not since unsubscribed, in the
    /// order they were issued.
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.shared.active_channels()
    }

    /// Frames waiting for the transport.
    pub fn queued_frames(&self) -> usize {
        self.shared.queued()
    }

    /// Frames evicted from a full outbound queue since the client was built.
    pub fn dropped_frames(&self) -> u64 {
        self.shared.dropped()
    }

    /// Handlers registered across event, channel and catch-all tables.
    pub fn total_listeners(&self) -> usize {
        self.shared.registry.total_listeners()
    }

    pub fn listener_count(&self, event_type: &EventType) -> usize {
        self.shared.registry.listener_count(event_type)
    }

    pub fn channel_listener_count(&self, channel: &str) -> usize {
        self.shared.registry.channel_listener_count(channel)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.shared.options
    }
}
