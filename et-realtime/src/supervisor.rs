//! Connection supervisor task.
//!
//! Owns the transport for one `connect` call: opens it, authenticates,
//! keeps it alive with heartbeats, drains the outbound queue, hands inbound
//! frames to the dispatcher and reconnects with backoff when it drops. It
//! stops on `Shutdown`, when reconnection is disabled, or when the attempt
//! budget is spent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use et_core::constants;
use et_core::error::{EtError, EtResult};

use crate::auto_subscribe;
use crate::client::Shared;
use crate::dispatcher::Dispatcher;
use crate::events::{AuthError, EventType};
use crate::frame::Frame;
use crate::heartbeat::{Beat, HeartbeatMonitor};
use crate::state::StatePatch;
use crate::transport::{Connector, Transport, TransportEvent};

/// Requests from client handles.
pub(crate) enum Command {
    /// Resolve the sender on the next successful open.
    AwaitOpen(oneshot::Sender<EtResult<()>>),
    /// Close the transport and stop.
    Shutdown,
}

/// Why `serve` returned.
enum Exit {
    Shutdown,
    /// The transport went away; `error` is set for failures, not clean closes.
    Lost { error: Option<String> },
}

struct Supervisor {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    commands: mpsc::Receiver<Command>,
    waiters: Vec<oneshot::Sender<EtResult<()>>>,
    attempts: u32,
    /// Set once this task will not open another transport. Raised before the
    /// final state is published so `connect` never queues on a dying task.
    retired: Arc<AtomicBool>,
}

pub(crate) async fn run(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    commands: mpsc::Receiver<Command>,
    ready: oneshot::Sender<EtResult<()>>,
    retired: Arc<AtomicBool>,
) {
    let mut supervisor = Supervisor {
        shared,
        connector,
        commands,
        waiters: vec![ready],
        attempts: 0,
        retired,
    };
    supervisor.run().await;
    debug!("supervisor stopped");
}

impl Supervisor {
    async fn run(&mut self) {
        loop {
            let Some(opened) = self.open().await else {
                self.stop();
                return;
            };

            match opened {
                Ok(transport) => {
                    self.attempts = 0;
                    match self.serve(transport).await {
                        Exit::Shutdown => {
                            self.stop();
                            return;
                        }
                        Exit::Lost { error } => {
                            let mut patch = StatePatch::new().connected(false).authenticated(false);
                            if let Some(error) = error {
                                warn!("realtime connection lost: {error}");
                                patch = patch.error(error);
                            } else {
                                info!("realtime connection closed");
                            }
                            self.shared.state.apply(patch);
                        }
                    }
                }
                Err(e) => {
                    warn!("realtime connect failed: {e}");
                    self.shared
                        .state
                        .apply(StatePatch::new().connected(false).error(e.to_string()));
                    self.resolve_waiters(|| Err(share_error(&e)));
                }
            }

            if !self.backoff().await {
                return;
            }
        }
    }

    /// Open a transport, accepting commands meanwhile. `None` means shutdown.
    async fn open(&mut self) -> Option<EtResult<Box<dyn Transport>>> {
        let options = &self.shared.options;
        let url = options.url.clone();
        let timeout = options.connect_timeout;
        let connector = self.connector.clone();

        let connect = async move {
            match tokio::time::timeout(timeout, connector.connect(&url)).await {
                Ok(result) => result,
                Err(_) => Err(EtError::Timeout(format!(
                    "connection to {url} timed out after {timeout:?}"
                ))),
            }
        };
        tokio::pin!(connect);

        loop {
            tokio::select! {
                result = &mut connect => return Some(result),
                cmd = self.commands.recv() => match cmd {
                    Some(Command::AwaitOpen(tx)) => self.waiters.push(tx),
                    Some(Command::Shutdown) | None => return None,
                },
            }
        }
    }

    /// Drive an open transport until it is lost or shut down.
    async fn serve(&mut self, mut transport: Box<dyn Transport>) -> Exit {
        let shared = self.shared.clone();
        shared.state.apply(
            StatePatch::new()
                .connected(true)
                .authenticated(false)
                .attempts(0)
                .clear_error(),
        );
        info!("realtime transport open: {}", shared.options.url);

        match shared.identity() {
            Some(identity) => {
                if let Err(e) = write_frame(transport.as_mut(), &Frame::auth(&identity)).await {
                    return Exit::Lost { error: Some(e.to_string()) };
                }
                debug!("authentication sent for {identity}");
            }
            None => warn!("no identity stored, skipping authentication"),
        }

        let mut heartbeat = HeartbeatMonitor::new(shared.options.heartbeat.clone());
        let period = heartbeat.interval().max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if let Err(error) = flush(&shared, transport.as_mut()).await {
            return Exit::Lost { error: Some(error) };
        }
        self.resolve_waiters(|| Ok(()));

        loop {
            tokio::select! {
                event = transport.recv() => match event {
                    TransportEvent::Text(text) => {
                        heartbeat.on_inbound();
                        for frame in handle_inbound(&shared, &text) {
                            if let Err(e) = write_frame(transport.as_mut(), &frame).await {
                                return Exit::Lost { error: Some(e.to_string()) };
                            }
                        }
                        if let Err(error) = flush(&shared, transport.as_mut()).await {
                            return Exit::Lost { error: Some(error) };
                        }
                    }
                    TransportEvent::Closed { code, reason } => {
                        debug!("transport closed (code {code:?}): {reason}");
                        return Exit::Lost { error: None };
                    }
                    TransportEvent::Error(error) => {
                        return Exit::Lost { error: Some(error) };
                    }
                },
                _ = ticker.tick() => match heartbeat.tick() {
                    Beat::Ping => {
                        trace!("heartbeat ping");
                        if let Err(e) = write_frame(transport.as_mut(), &Frame::ping()).await {
                            return Exit::Lost { error: Some(e.to_string()) };
                        }
                    }
                    Beat::Stale(missed) => {
                        warn!("no inbound traffic after {missed} heartbeat(s), dropping connection");
                        transport.close().await;
                        return Exit::Lost {
                            error: Some(format!("heartbeat timeout after {missed} unanswered ping(s)")),
                        };
                    }
                },
                _ = shared.flush.notified() => {
                    if let Err(error) = flush(&shared, transport.as_mut()).await {
                        return Exit::Lost { error: Some(error) };
                    }
                }
                cmd = self.commands.recv() => match cmd {
                    Some(Command::AwaitOpen(tx)) => {
                        let _ = tx.send(Ok(()));
                    }
                    Some(Command::Shutdown) | None => {
                        transport.close().await;
                        return Exit::Shutdown;
                    }
                },
            }
        }
    }

    /// Wait out the next backoff delay. Returns `false` when the supervisor
    /// should stop.
    async fn backoff(&mut self) -> bool {
        let policy = self.shared.options.reconnect.clone();
        if !policy.enabled {
            info!("auto-reconnect disabled, supervisor stopping");
            self.retire();
            self.resolve_waiters(|| Err(EtError::SocketDisconnected));
            return false;
        }

        let Some(delay) = policy.next_delay(self.attempts) else {
            error!(
                "giving up after {} reconnection attempt(s)",
                self.attempts
            );
            self.retire();
            self.shared
                .state
                .apply(StatePatch::new().error(constants::RECONNECT_EXHAUSTED_MESSAGE));
            let attempts = self.attempts;
            self.resolve_waiters(|| Err(EtError::ReconnectExhausted { attempts }));
            return false;
        };

        self.attempts += 1;
        let max_attempts = policy.max_attempts;
        self.shared
            .state
            .apply(StatePatch::new().attempts(self.attempts));
        warn!(
            "reconnecting in {:.1}s (attempt {}/{max_attempts})",
            delay.as_secs_f64(),
            self.attempts
        );

        let wait = sleep(delay);
        tokio::pin!(wait);
        loop {
            tokio::select! {
                _ = &mut wait => return true,
                cmd = self.commands.recv() => match cmd {
                    Some(Command::AwaitOpen(tx)) => self.waiters.push(tx),
                    Some(Command::Shutdown) | None => {
                        info!("reconnection cancelled");
                        self.stop();
                        return false;
                    }
                },
            }
        }
    }

    /// Caller-requested stop.
    fn stop(&mut self) {
        self.retire();
        self.shared
            .state
            .apply(StatePatch::new().connected(false).authenticated(false));
        self.resolve_waiters(|| Err(EtError::SocketDisconnected));
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    fn resolve_waiters(&mut self, outcome: impl Fn() -> EtResult<()>) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome());
        }
    }
}

/// Rebuild an error for each waiter; `EtError` is not `Clone`.
fn share_error(e: &EtError) -> EtError {
    match e {
        EtError::Timeout(msg) => EtError::Timeout(msg.clone()),
        EtError::Socket(msg) => EtError::Socket(msg.clone()),
        other => EtError::Socket(other.to_string()),
    }
}

async fn write_frame(transport: &mut dyn Transport, frame: &Frame) -> EtResult<()> {
    transport.send_text(frame.encode()?).await
}

/// Write queued frames in order. A frame whose write fails goes back to the
/// front of the queue.
async fn flush(shared: &Shared, transport: &mut dyn Transport) -> Result<(), String> {
    while let Some(frame) = shared.next_outbound() {
        let text = match frame.encode() {
            Ok(text) => text,
            Err(e) => {
                error!("dropping '{}' frame that failed to encode: {e}", frame.event_type);
                continue;
            }
        };
        if let Err(e) = transport.send_text(text).await {
            shared.requeue_front(frame);
            return Err(e.to_string());
        }
    }
    Ok(())
}

/// Decode one inbound frame, apply protocol side effects, then dispatch it.
/// Returns frames that must reach the transport ahead of the outbound queue.
fn handle_inbound(shared: &Shared, text: &str) -> Vec<Frame> {
    let Some(frame) = Dispatcher::decode(text) else {
        return Vec::new();
    };

    let urgent = match &frame.event_type {
        EventType::AuthSuccess => on_authenticated(shared),
        EventType::AuthError => {
            let message = frame
                .payload::<AuthError>()
                .map(|p| p.message)
                .unwrap_or_else(|_| "authentication rejected".to_string());
            let rejected = EtError::AuthFailed(message);
            warn!("{rejected}");
            shared.state.apply(
                StatePatch::new()
                    .authenticated(false)
                    .error(rejected.to_string()),
            );
            Vec::new()
        }
        EventType::Pong => {
            trace!("heartbeat pong");
            Vec::new()
        }
        _ => Vec::new(),
    };

    let report = shared.dispatcher.dispatch(&frame);
    if report.failures > 0 {
        warn!(
            "{} of {} handler(s) for '{}' panicked",
            report.failures,
            report.total(),
            frame.event_type
        );
    } else if report.total() == 0 && !frame.event_type.is_control() {
        trace!("no handlers registered for '{}'", frame.event_type);
    }
    urgent
}

/// Build the subscription batch (the role-based plan first, then
/// caller-requested channels) and mark the session authenticated.
///
/// The batch is snapshotted before observers hear about the authentication,
/// so a `subscribe` issued in reaction to it is sent exactly once. It is
/// written straight to the transport so a bounded outbound queue can never
/// evict part of it.
fn on_authenticated(shared: &Shared) -> Vec<Frame> {
    let channels = match shared.identity() {
        Some(identity) => {
            let mut channels = auto_subscribe::subscription_plan(&identity);
            for channel in shared.requested_channels() {
                if !channels.contains(&channel) {
                    channels.push(channel);
                }
            }
            info!("authenticated as {identity}, subscribing to {} channel(s)", channels.len());
            shared.set_active(channels.clone());
            channels
        }
        None => {
            warn!("auth_success without a stored identity");
            Vec::new()
        }
    };

    shared
        .state
        .apply(StatePatch::new().authenticated(true).clear_error());
    channels.into_iter().map(Frame::subscribe).collect()
}
