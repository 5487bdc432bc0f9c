//! Typed event-listener registries.
//!
//! Routes and client sessions announce lifecycle events (connection opened,
//! frame received, transfer progress, errors) through [`EventListeners`].
//! Listeners are invoked synchronously on the task that detected the event,
//! in subscription order. Subscription returns a [`ListenerId`] that can be
//! used to unsubscribe later.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A registry of listeners for one event type.
///
/// Cheap to share behind an `Arc`; `notify` takes `&self` and may be called
/// concurrently with subscription changes.
pub struct EventListeners<T> {
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> EventListeners<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a listener and returns its id.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if the id was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Invokes every registered listener with `event`, in subscription order.
    ///
    /// The listener table is snapshotted before invocation, so a listener
    /// may subscribe or unsubscribe without deadlocking; changes take effect
    /// from the next notification.
    pub fn notify(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether the registry has no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl<T> Default for EventListeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventListeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("listeners", &self.len())
            .finish()
    }
}
