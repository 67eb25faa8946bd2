//! Local listener tables.
//!
//! Handlers keyed by event type (invoked with the frame's `data`), handlers
//! keyed by channel (invoked with the whole frame) and catch-all handlers
//! that see every frame. Registration returns an [`Unsubscribe`] handle that removes exactly
//! the handler it was issued for.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use serde_json::Value;

use crate::events::EventType;
use crate::frame::Frame;

/// Handler for frames of one event type; receives the frame's `data`.
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handler for frames tagged with one channel; receives the whole frame.
pub type ChannelHandler = Arc<dyn Fn(&Frame) + Send + Sync>;

/// Handle returned by every registration.
///
/// Dropping the handle leaves the handler registered; call
/// [`Unsubscribe::unsubscribe`] to remove it.
pub struct Unsubscribe {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Unsubscribe {
    pub(crate) fn new(remove: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// Remove the handler. Later dispatches will not reach it.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

/// Keyed handler lists with stable ids for removal.
struct HandlerTable<K, H> {
    entries: RwLock<HashMap<K, Vec<(u64, H)>>>,
}

impl<K: Eq + Hash + Clone, H: Clone> HandlerTable<K, H> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, key: K, id: u64, handler: H) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_default().push((id, handler));
    }

    fn remove(&self, key: &K, id: u64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = entries.get_mut(key) {
            list.retain(|(existing, _)| *existing != id);
            if list.is_empty() {
                entries.remove(key);
            }
        }
    }

    fn clear(&self, key: &K) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).map(|list| list.len()).unwrap_or(0)
    }

    /// Handlers for a key, cloned so none are invoked under the lock.
    fn snapshot(&self, key: &K) -> Vec<H> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    fn count(&self, key: &K) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).map(Vec::len).unwrap_or(0)
    }

    fn total(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(Vec::len).sum()
    }
}

struct RegistryInner {
    next_id: AtomicU64,
    events: HandlerTable<EventType, EventHandler>,
    channels: HandlerTable<String, ChannelHandler>,
    any: HandlerTable<(), ChannelHandler>,
}

/// Shared listener registry. Cloning yields another handle to the same tables.
#[derive(Clone)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(1),
                events: HandlerTable::new(),
                channels: HandlerTable::new(),
                any: HandlerTable::new(),
            }),
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a handler for an event type.
    pub fn on(&self, event_type: EventType, handler: EventHandler) -> Unsubscribe {
        let id = self.next_id();
        self.inner.events.insert(event_type.clone(), id, handler);

        let weak: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.events.remove(&event_type, id);
            }
        })
    }

    /// Register a handler for a channel.
    pub fn on_channel(&self, channel: impl Into<String>, handler: ChannelHandler) -> Unsubscribe {
        let channel = channel.into();
        let id = self.next_id();
        self.inner.channels.insert(channel.clone(), id, handler);

        let weak: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.channels.remove(&channel, id);
            }
        })
    }

    /// Register a handler for every inbound frame, whatever its event type
    /// or channel. Names missing from the event catalog reach it too.
    pub fn on_any(&self, handler: ChannelHandler) -> Unsubscribe {
        let id = self.next_id();
        self.inner.any.insert((), id, handler);

        let weak: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.any.remove(&(), id);
            }
        })
    }

    /// Drop every handler registered for a channel; returns how many were removed.
    pub fn clear_channel(&self, channel: &str) -> usize {
        self.inner.channels.clear(&channel.to_string())
    }

    pub fn event_handlers(&self, event_type: &EventType) -> Vec<EventHandler> {
        self.inner.events.snapshot(event_type)
    }

    pub fn channel_handlers(&self, channel: &str) -> Vec<ChannelHandler> {
        self.inner.channels.snapshot(&channel.to_string())
    }

    pub fn catch_all_handlers(&self) -> Vec<ChannelHandler> {
        self.inner.any.snapshot(&())
    }

    pub fn listener_count(&self, event_type: &EventType) -> usize {
        self.inner.events.count(event_type)
    }

    pub fn channel_listener_count(&self, channel: &str) -> usize {
        self.inner.channels.count(&channel.to_string())
    }

    /// Total handlers across all tables.
    pub fn total_listeners(&self) -> usize {
        self.inner.events.total() + self.inner.channels.total() + self.inner.any.total()
    }
}
