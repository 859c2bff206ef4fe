//! Named notifications raised by a database handle.
//!
//! The driver owns an [`EventBroker`] and raises events on it; the transaction
//! coordinator only sees the [`EventSource`] trait.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::SqlSyncError;

/// Notifications a handle can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbEvent {
    /// The driver rolled back the open transaction.
    Rollback,
}

impl DbEvent {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DbEvent::Rollback => "rollback",
        }
    }
}

impl fmt::Display for DbEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DbEvent {
    type Err = SqlSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rollback" => Ok(DbEvent::Rollback),
            other => Err(SqlSyncError::Other(format!("unknown event name: {other}"))),
        }
    }
}

/// Callback invoked when an event is raised.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Token returned by [`EventSource::add_listener`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Subscribe/unsubscribe side of a handle's notifications.
pub trait EventSource {
    /// Register `listener` for `event`.
    fn add_listener(&self, event: DbEvent, listener: Listener) -> ListenerId;

    /// Unregister a listener. Returns `false` when nothing was registered under `id` for `event`.
    fn remove_listener(&self, event: DbEvent, id: ListenerId) -> bool;
}

/// Listener registry that drivers compose to raise [`DbEvent`]s.
#[derive(Default)]
pub struct EventBroker {
    listeners: Mutex<Vec<(ListenerId, DbEvent, Listener)>>,
    next_id: AtomicU64,
}

impl EventBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, DbEvent, Listener)>> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Invoke every listener registered for `event`, in registration order.
    ///
    /// Listeners run after the registry lock is released, so a listener may
    /// register or unregister others. Returns how many listeners ran.
    pub fn emit(&self, event: DbEvent) -> usize {
        let targets: Vec<Listener> = self
            .lock()
            .iter()
            .filter(|(_, registered, _)| *registered == event)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();
        tracing::debug!(event = %event, listeners = targets.len(), "emitting database event");
        for listener in &targets {
            listener();
        }
        targets.len()
    }

    #[must_use]
    pub fn listener_count(&self, event: DbEvent) -> usize {
        self.lock()
            .iter()
            .filter(|(_, registered, _)| *registered == event)
            .count()
    }
}

impl EventSource for EventBroker {
    fn add_listener(&self, event: DbEvent, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, event, listener));
        id
    }

    fn remove_listener(&self, event: DbEvent, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(registered_id, registered, _)| {
            !(*registered_id == id && *registered == event)
        });
        listeners.len() != before
    }
}

impl fmt::Debug for EventBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBroker")
            .field("listeners", &self.lock().len())
            .finish()
    }
}
