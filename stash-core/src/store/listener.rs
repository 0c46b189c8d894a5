//! Listener registry.
//!
//! Listeners are zero-argument callbacks fired after every completed state
//! update. Closures have no identity of their own, so each registration gets
//! a fresh [`ListenerId`]; registering the same closure twice yields two
//! independent entries.
//!
//! The registry is copy-on-write: adding or removing a listener installs a
//! brand new list, and a notification pass iterates whatever list was
//! current when it started. Listeners are free to subscribe or unsubscribe
//! while a pass is running without disturbing it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;

/// A change listener.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Unique identifier for one listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct Entry {
    pub(crate) id: ListenerId,
    pub(crate) listener: Listener,
}

/// An immutable view of the registered listeners, in registration order.
pub(crate) type ListenerList = Arc<SmallVec<[Entry; 4]>>;

#[derive(Default)]
pub(crate) struct Registry {
    entries: RwLock<ListenerList>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The list as of now. Later changes do not affect the returned value.
    pub(crate) fn snapshot(&self) -> ListenerList {
        Arc::clone(&*self.entries.read())
    }

    pub(crate) fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId::new();
        let mut guard = self.entries.write();
        let mut next = (**guard).clone();
        next.push(Entry { id, listener });
        *guard = Arc::new(next);
        id
    }

    /// Returns `false` if no entry had this id.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut guard = self.entries.write();
        if !guard.iter().any(|entry| entry.id == id) {
            return false;
        }
        let next: SmallVec<[Entry; 4]> = guard
            .iter()
            .filter(|entry| entry.id != id)
            .cloned()
            .collect();
        *guard = Arc::new(next);
        true
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.entries.read().iter().any(|entry| entry.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Removes one listener registration from its store.
///
/// Calling [`unsubscribe`](Self::unsubscribe) more than once is a silent
/// no-op, as is calling it after the store is gone. Dropping the handle
/// leaves the listener registered.
#[derive(Clone)]
pub struct Unsubscribe {
    id: ListenerId,
    registry: Weak<Registry>,
}

impl Unsubscribe {
    pub(crate) fn new(id: ListenerId, registry: &Arc<Registry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    /// The registration this handle removes.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                tracing::trace!(listener = self.id.raw(), "listener removed");
            }
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.contains(self.id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
