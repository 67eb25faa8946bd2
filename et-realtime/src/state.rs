//! Connection state snapshots and observers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::dispatcher::isolate;
use crate::registry::Unsubscribe;

/// Immutable snapshot of the connection.
///
/// `is_authenticated` implies `is_connected`; [`ConnectionState::merge`]
/// enforces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub is_connected: bool,
    pub is_authenticated: bool,
    pub reconnect_attempts: u32,
    pub error: Option<String>,
}

/// Partial update applied with [`ConnectionState::merge`]. `None` fields are kept.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub is_connected: Option<bool>,
    pub is_authenticated: Option<bool>,
    pub reconnect_attempts: Option<u32>,
    pub error: Option<Option<String>>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(mut self, value: bool) -> Self {
        self.is_connected = Some(value);
        self
    }

    pub fn authenticated(mut self, value: bool) -> Self {
        self.is_authenticated = Some(value);
        self
    }

    pub fn attempts(mut self, value: u32) -> Self {
        self.reconnect_attempts = Some(value);
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(Some(message.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }
}

impl ConnectionState {
    /// New snapshot with the patch applied on top of this one.
    pub fn merge(&self, patch: &StatePatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.is_connected {
            next.is_connected = v;
        }
        if let Some(v) = patch.is_authenticated {
            next.is_authenticated = v;
        }
        if let Some(v) = patch.reconnect_attempts {
            next.reconnect_attempts = v;
        }
        if let Some(v) = &patch.error {
            next.error = v.clone();
        }
        if !next.is_connected {
            next.is_authenticated = false;
        }
        next
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_authenticated {
            write!(f, "authenticated")?;
        } else if self.is_connected {
            write!(f, "connected")?;
        } else if self.reconnect_attempts > 0 {
            write!(f, "reconnecting (attempt {})", self.reconnect_attempts)?;
        } else {
            write!(f, "disconnected")?;
        }
        if let Some(error) = &self.error {
            write!(f, " [{error}]")?;
        }
        Ok(())
    }
}

/// Callback invoked with every new state snapshot.
pub type StateObserver = Arc<dyn Fn(&ConnectionState) + Send + Sync>;

type ObserverList = Mutex<Vec<(u64, StateObserver)>>;

/// Holds the current state and fans transitions out to observers.
pub struct StateHub {
    tx: watch::Sender<ConnectionState>,
    observers: Arc<ObserverList>,
    next_id: AtomicU64,
}

impl Default for StateHub {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHub {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::default());
        Self {
            tx,
            observers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn current(&self) -> ConnectionState {
        self.tx.borrow().clone()
    }

    pub fn receiver(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Merge a patch into the current state.
    ///
    /// Observers run only when the merged snapshot differs from the current
    /// one. Returns whether a transition happened.
    pub fn apply(&self, patch: StatePatch) -> bool {
        let mut transition = None;
        self.tx.send_if_modified(|state| {
            let next = state.merge(&patch);
            if next == *state {
                return false;
            }
            transition = Some((std::mem::replace(state, next.clone()), next));
            true
        });

        let Some((previous, next)) = transition else {
            return false;
        };
        info!("realtime state: {previous} -> {next}");

        let observers: Vec<StateObserver> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, o)| o.clone())
            .collect();
        for observer in observers {
            isolate("state observer", || observer(&next));
        }
        true
    }

    /// Register an observer. It is called right away with the current
    /// snapshot and then on every transition.
    pub fn on_change(&self, observer: StateObserver) -> Unsubscribe {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let snapshot = {
            let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
            observers.push((id, observer.clone()));
            self.current()
        };
        isolate("state observer", || observer(&snapshot));

        let weak: Weak<ObserverList> = Arc::downgrade(&self.observers);
        Unsubscribe::new(move || {
            if let Some(observers) = weak.upgrade() {
                observers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(existing, _)| *existing != id);
            }
        })
    }
}
