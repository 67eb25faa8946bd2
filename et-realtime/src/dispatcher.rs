//! Inbound frame dispatch.
//!
//! Each decoded frame goes through three passes: handlers registered for its
//! event type receive `data`, handlers registered for its channel (if any)
//! receive the frame, and catch-all handlers receive the frame last. A panicking handler is logged and skipped; it
//! never stops the remaining handlers or the connection.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, trace, warn};

use crate::frame::Frame;
use crate::registry::ListenerRegistry;

/// Run `f`, catching and logging a panic. Returns `false` if `f` panicked.
pub(crate) fn isolate<F: FnOnce()>(label: &str, f: F) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!("{label} panicked: {}", panic_message(payload.as_ref()));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Event-type handlers invoked.
    pub event_handlers: usize,
    /// Channel handlers invoked.
    pub channel_handlers: usize,
    /// Catch-all handlers invoked.
    pub catch_all_handlers: usize,
    /// Handlers that panicked.
    pub failures: usize,
}

impl DispatchReport {
    /// Handlers invoked across all passes.
    pub fn total(&self) -> usize {
        self.event_handlers + self.channel_handlers + self.catch_all_handlers
    }
}

/// Routes inbound frames to the listener registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: ListenerRegistry,
}

impl Dispatcher {
    pub fn new(registry: ListenerRegistry) -> Self {
        Self { registry }
    }

    /// Decode a text frame, logging and dropping it if malformed.
    pub fn decode(text: &str) -> Option<Frame> {
        match Frame::decode(text) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("dropping inbound frame: {e}");
                trace!("malformed frame body: {text}");
                None
            }
        }
    }

    /// Invoke every matching handler for the frame. All passes always run.
    pub fn dispatch(&self, frame: &Frame) -> DispatchReport {
        let mut report = DispatchReport::default();

        let label = format!("handler for '{}'", frame.event_type);
        for handler in self.registry.event_handlers(&frame.event_type) {
            report.event_handlers += 1;
            if !isolate(&label, || handler(&frame.data)) {
                report.failures += 1;
            }
        }

        if let Some(channel) = frame.channel.as_deref() {
            let label = format!("handler for channel '{channel}'");
            for handler in self.registry.channel_handlers(channel) {
                report.channel_handlers += 1;
                if !isolate(&label, || handler(frame)) {
                    report.failures += 1;
                }
            }
        }

        for handler in self.registry.catch_all_handlers() {
            report.catch_all_handlers += 1;
            if !isolate("catch-all handler", || handler(frame)) {
                report.failures += 1;
            }
        }

        debug!(
            "dispatched {} (channel: {}): {} event / {} channel / {} catch-all handler(s), {} failed",
            frame.event_type,
            frame.channel.as_deref().unwrap_or("-"),
            report.event_handlers,
            report.channel_handlers,
            report.catch_all_handlers,
            report.failures
        );
        report
    }
}
