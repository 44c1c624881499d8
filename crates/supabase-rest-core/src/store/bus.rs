use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use super::{ContextId, EventScope, StorageEvent};

/// Callback invoked for every storage event a context should see.
pub type StorageHandler = Arc<dyn Fn(&StorageEvent) + Send + Sync + 'static>;

struct Listener {
    id: u64,
    context: ContextId,
    handler: StorageHandler,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: RwLock<Vec<Listener>>,
}

impl BusInner {
    fn remove(&self, id: u64) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|l| l.id != id);
    }
}

/// Pub/sub channel carrying [`StorageEvent`]s between contexts.
///
/// Independent of how values are stored: any number of store handles
/// (memory, file, or custom) may publish on the same bus.
#[derive(Clone, Default)]
pub struct StorageBus {
    inner: Arc<BusInner>,
}

impl StorageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler on behalf of `context`.
    pub fn subscribe(&self, context: ContextId, handler: StorageHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Listener {
                id,
                context,
                handler,
            });
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event according to its scope.
    ///
    /// Handlers run synchronously on the publishing thread, outside the
    /// listener lock, so they may subscribe or unsubscribe freely.
    pub fn publish(&self, event: &StorageEvent) {
        let targets: Vec<StorageHandler> = {
            let listeners = self
                .inner
                .listeners
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            listeners
                .iter()
                .filter(|l| match event.scope {
                    EventScope::Broadcast => l.context != event.origin,
                    EventScope::Local => l.context == event.origin,
                })
                .map(|l| Arc::clone(&l.handler))
                .collect()
        };
        tracing::trace!(
            key = %event.key,
            origin = %event.origin,
            listeners = targets.len(),
            "Publishing storage event"
        );
        for handler in targets {
            handler(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for StorageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle returned by `subscribe`. Unsubscribes when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Stop receiving events.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
