//! Store Implementation
//!
//! A Store owns one state value, the value it replaced most recently, and
//! the listeners to fire whenever it changes.
//!
//! # How Updates Work
//!
//! 1. The current state is captured as the previous state.
//!
//! 2. The update is resolved to a partial. Updater functions see the state
//!    as it was before this call.
//!
//! 3. The partial is shallow-merged onto that state and the result becomes
//!    the new current state.
//!
//! 4. Every listener registered when the notification pass starts is called,
//!    in registration order, with no arguments.
//!
//! # Re-entrancy
//!
//! No lock is held while an updater or a listener runs. A listener may read
//! snapshots, subscribe, unsubscribe, or call `set_state` again. A nested
//! `set_state` runs its own complete merge and notification pass before the
//! outer pass moves on to its remaining listeners.
//!
//! # Snapshots
//!
//! State is stored behind an `Arc`. Each completed update installs a new
//! `Arc`, so a renderer can detect "unchanged" with `Arc::ptr_eq`.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::listener::{Listener, Registry, Unsubscribe};
use super::merge::Merge;
use super::update::Update;

/// Unique identifier for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(u64);

impl StoreId {
    /// Generate a new unique store ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a store's current snapshot without keeping the store alive.
pub struct SnapshotReader<S> {
    cell: Weak<RwLock<Arc<S>>>,
}

impl<S> SnapshotReader<S> {
    /// The current snapshot, or `None` once the store has been dropped.
    pub fn read(&self) -> Option<Arc<S>> {
        self.cell.upgrade().map(|cell| Arc::clone(&*cell.read()))
    }
}

impl<S> Clone for SnapshotReader<S> {
    fn clone(&self) -> Self {
        Self {
            cell: Weak::clone(&self.cell),
        }
    }
}

/// Holds state, applies merge updates, and notifies listeners.
///
/// # Example
///
/// ```rust
/// use indexmap::IndexMap;
/// use stash_core::store::{Store, Update};
///
/// let store = Store::new(IndexMap::from([("count", 0)]));
///
/// let unsubscribe = store.subscribe(|| println!("changed"), false);
/// store.set_state(Update::partial(IndexMap::from([("count", 10)])));
///
/// assert_eq!(store.get_snapshot()["count"], 10);
/// assert_eq!(store.get_prev_state()["count"], 0);
/// unsubscribe.unsubscribe();
/// ```
pub struct Store<S>
where
    S: Merge,
{
    /// Unique identifier for this store.
    id: StoreId,

    /// Label used in log events.
    name: String,

    /// The live state, shared weakly with snapshot readers.
    state: Arc<RwLock<Arc<S>>>,

    /// The state replaced by the latest update. Equals the initial state
    /// until the first update.
    prev_state: RwLock<Arc<S>>,

    /// Copy-on-write listener registry, shared weakly with unsubscribe handles.
    listeners: Arc<Registry>,
}

impl<S> Store<S>
where
    S: Merge,
{
    /// Create a new store seeded with the given state.
    pub fn new(initial: S) -> Self {
        Self::with_name("anonymous", initial)
    }

    /// Create a new store with a name used in log events.
    pub fn with_name(name: impl Into<String>, initial: S) -> Self {
        let name = name.into();
        let initial = Arc::new(initial);
        tracing::debug!(store = %name, "store created");

        Self {
            id: StoreId::new(),
            name,
            prev_state: RwLock::new(Arc::clone(&initial)),
            state: Arc::new(RwLock::new(initial)),
            listeners: Arc::new(Registry::new()),
        }
    }

    /// Get the store's unique ID.
    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Get the store's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current state.
    pub fn get_snapshot(&self) -> Arc<S> {
        Arc::clone(&*self.state.read())
    }

    /// Get a reader for the current state that does not own the store.
    pub fn snapshot_reader(&self) -> SnapshotReader<S> {
        SnapshotReader {
            cell: Arc::downgrade(&self.state),
        }
    }

    /// Get the state as it was right before the latest update.
    pub fn get_prev_state(&self) -> Arc<S> {
        Arc::clone(&*self.prev_state.read())
    }

    /// Merge an update into the state and notify every listener.
    ///
    /// If an updater function panics, the panic propagates to the caller.
    /// The previous state has already been overwritten by then and the
    /// current state is left as it was.
    pub fn set_state(&self, update: Update<S>) {
        let current = self.get_snapshot();
        *self.prev_state.write() = Arc::clone(&current);

        let partial = update.resolve(&current);
        let next = Arc::new(current.merge(partial));
        *self.state.write() = next;

        tracing::debug!(
            store = %self.name,
            listeners = self.listener_count(),
            "state updated"
        );
        self.notify_listeners();
    }

    /// Register a listener.
    ///
    /// With `call_immediately`, the listener runs once before it is added
    /// to the registry. The returned handle removes exactly this
    /// registration.
    pub fn subscribe<F>(&self, listener: F, call_immediately: bool) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_listener(Arc::new(listener), call_immediately)
    }

    /// Register a listener without calling it first.
    pub fn subscribe_default<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(listener, false)
    }

    /// Register an already shared listener.
    pub fn subscribe_listener(&self, listener: Listener, call_immediately: bool) -> Unsubscribe {
        if call_immediately {
            listener();
        }

        let id = self.listeners.add(listener);
        tracing::trace!(store = %self.name, listener = id.raw(), "listener added");

        Unsubscribe::new(id, &self.listeners)
    }

    /// Call every listener registered at the start of this pass.
    pub fn notify_listeners(&self) {
        let listeners = self.listeners.snapshot();
        tracing::trace!(store = %self.name, listeners = listeners.len(), "notifying listeners");

        for entry in listeners.iter() {
            (entry.listener)();
        }
    }

    /// Get the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<S> Debug for Store<S>
where
    S: Merge + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("state", &self.get_snapshot())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    type State = IndexMap<&'static str, i64>;

    fn counter(count: i64) -> State {
        IndexMap::from([("count", count)])
    }

    #[test]
    fn store_set_and_get() {
        let store = Store::new(counter(0));
        assert_eq!(*store.get_snapshot(), counter(0));

        store.set_state(Update::partial(counter(10)));
        assert_eq!(*store.get_snapshot(), counter(10));
        assert_eq!(*store.get_prev_state(), counter(0));
    }

    #[test]
    fn prev_state_equals_initial_before_first_update() {
        let store = Store::new(counter(3));
        assert!(Arc::ptr_eq(&store.get_snapshot(), &store.get_prev_state()));
    }

    #[test]
    fn prev_state_tracks_latest_update() {
        let store = Store::new(counter(0));
        store.set_state(Update::partial(counter(1)));
        store.set_state(Update::partial(counter(2)));
        store.set_state(Update::partial(counter(3)));

        assert_eq!(store.get_prev_state()["count"], 2);
        assert_eq!(store.get_snapshot()["count"], 3);
    }

    #[test]
    fn updater_sees_pre_update_state() {
        let store = Store::new(counter(10));
        store.set_state(Update::with(|s: &State| counter(s["count"] + 5)));
        assert_eq!(store.get_snapshot()["count"], 15);
    }

    #[test]
    fn merge_keeps_other_keys() {
        let store = Store::new(IndexMap::from([("count", 0), ("step", 2)]));
        store.set_state(Update::partial(counter(7)));

        let state = store.get_snapshot();
        assert_eq!(state["count"], 7);
        assert_eq!(state["step"], 2);
    }

    #[test]
    fn every_update_installs_new_snapshot() {
        let store = Store::new(counter(0));
        let before = store.get_snapshot();

        // Identical values are not deduplicated
        store.set_state(Update::partial(counter(0)));
        assert!(!Arc::ptr_eq(&before, &store.get_snapshot()));
        assert!(Arc::ptr_eq(&before, &store.get_prev_state()));
    }

    #[test]
    fn store_notifies_listeners_in_order() {
        let store = Store::new(counter(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let log1 = log.clone();
        store.subscribe(move || log1.lock().push("first"), false);
        let log2 = log.clone();
        store.subscribe(move || log2.lock().push("second"), false);

        store.set_state(Update::partial(counter(1)));
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn subscribe_without_immediate_call() {
        let store = Store::new(counter(0));
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        store.subscribe(
            move || {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            },
            false,
        );
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        store.set_state(Update::partial(counter(1)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribe_immediately_runs_before_registration() {
        let store = Arc::new(Store::new(counter(0)));
        let seen_count = Arc::new(AtomicI32::new(-1));

        let store_clone = store.clone();
        let seen_clone = seen_count.clone();
        store.subscribe(
            move || {
                seen_clone.store(store_clone.listener_count() as i32, Ordering::SeqCst);
            },
            true,
        );

        // The immediate call happened while the registry was still empty
        assert_eq!(seen_count.load(Ordering::SeqCst), 0);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn subscribe_default_waits_for_next_update() {
        let store = Store::new(counter(0));
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        store.subscribe_default(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        store.set_state(Update::partial(counter(1)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_reader_follows_updates_without_owning_store() {
        let store = Store::new(counter(0));
        let reader = store.snapshot_reader();
        assert!(Arc::ptr_eq(&reader.read().unwrap(), &store.get_snapshot()));

        store.set_state(Update::partial(counter(8)));
        assert_eq!(reader.read().unwrap()["count"], 8);

        drop(store);
        assert!(reader.read().is_none());
    }

    #[test]
    fn store_ids_are_unique() {
        let s1 = Store::new(counter(0));
        let s2 = Store::new(counter(0));
        assert_ne!(s1.id(), s2.id());
    }

    #[test]
    fn store_unsubscribe() {
        let store = Store::new(counter(0));
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let unsubscribe = store.subscribe(
            move || {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            },
            false,
        );

        store.set_state(Update::partial(counter(1)));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        unsubscribe.unsubscribe();
        unsubscribe.unsubscribe();
        store.set_state(Update::partial(counter(2)));
        // Should not have been called again
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn same_listener_registered_twice_fires_twice() {
        let store = Store::new(counter(0));
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let listener: Listener = Arc::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let first = store.subscribe_listener(listener.clone(), false);
        let _second = store.subscribe_listener(listener, false);
        assert_ne!(first.id(), _second.id());

        store.set_state(Update::partial(counter(1)));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);

        first.unsubscribe();
        store.set_state(Update::partial(counter(2)));
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn listener_reads_post_update_snapshot() {
        let store = Arc::new(Store::new(counter(0)));
        let seen = Arc::new(AtomicI32::new(-1));

        let store_clone = store.clone();
        let seen_clone = seen.clone();
        store.subscribe(
            move || {
                seen_clone.store(store_clone.get_snapshot()["count"] as i32, Ordering::SeqCst);
            },
            false,
        );

        store.set_state(Update::partial(counter(42)));
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }
}
