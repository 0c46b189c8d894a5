//! Store factory and accessor.
//!
//! [`create_store`] builds a store from an initializer that receives a
//! [`Setter`]. The initializer usually returns a state that carries action
//! handles closing over that setter, so actions can update the store
//! without a direct reference to it.
//!
//! The setter has to exist before the store does, so construction happens
//! in two phases: the setter starts out unbound, the initializer produces
//! the seed state, the store is built from it, and finally the setter is
//! bound to the new store. The setter holds the store weakly; state that
//! contains actions therefore never keeps its own store alive.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

use super::external::{ExternalStore, RenderContext};
use super::listener::{Listener, Unsubscribe};
use super::merge::Merge;
use super::store::{SnapshotReader, Store, StoreId};
use super::update::Update;

/// A forwarding handle to a store's `set_state`, resolved after construction.
pub struct Setter<S>
where
    S: Merge,
{
    name: Arc<str>,
    target: Arc<OnceLock<Weak<Store<S>>>>,
}

impl<S> Setter<S>
where
    S: Merge,
{
    fn unbound(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            target: Arc::new(OnceLock::new()),
        }
    }

    /// Called exactly once, right after the store is built.
    fn bind(&self, store: &Arc<Store<S>>) {
        let bound = self.target.set(Arc::downgrade(store)).is_ok();
        debug_assert!(bound, "setter for store `{}` bound twice", self.name);
    }

    /// Whether the store this setter forwards to has been constructed.
    pub fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }

    /// Forward an update to the store.
    pub fn set_state(&self, update: Update<S>) -> Result<()> {
        let Some(target) = self.target.get() else {
            tracing::warn!(store = %self.name, "setter used before store was constructed");
            return Err(StoreError::Unbound(self.name.to_string()));
        };

        let Some(store) = target.upgrade() else {
            tracing::warn!(store = %self.name, "setter used after store was released");
            return Err(StoreError::Released(self.name.to_string()));
        };

        store.set_state(update);
        Ok(())
    }

    /// Merge a partial value.
    pub fn set(&self, partial: S::Partial) -> Result<()> {
        self.set_state(Update::partial(partial))
    }

    /// Merge the partial computed from the current state.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&S) -> S::Partial + Send + 'static,
    {
        self.set_state(Update::with(f))
    }
}

impl<S> Clone for Setter<S>
where
    S: Merge,
{
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            target: Arc::clone(&self.target),
        }
    }
}

impl<S> fmt::Debug for Setter<S>
where
    S: Merge,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("store", &self.name)
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// The accessor returned by [`create_store`].
///
/// Cloning the handle shares the same store.
pub struct StoreHandle<S>
where
    S: Merge,
{
    store: Arc<Store<S>>,
    config: Arc<StoreConfig>,
}

impl<S> StoreHandle<S>
where
    S: Merge + Send + Sync + 'static,
{
    /// Reactive read of the full state through `ctx`.
    pub fn use_store<C>(&self, ctx: &C) -> Arc<S>
    where
        C: RenderContext,
    {
        ctx.sync_external_store(self)
    }

    /// Reactive read of a selected slice of the state through `ctx`.
    pub fn use_selector<C, T, F>(&self, ctx: &C, selector: F) -> T
    where
        C: RenderContext,
        F: FnOnce(&S) -> T,
    {
        let state = self.use_store(ctx);
        selector(&state)
    }

    /// Get the current state without subscribing.
    pub fn get_state(&self) -> Arc<S> {
        self.store.get_snapshot()
    }

    /// Forward an update to the store.
    pub fn set_state(&self, update: Update<S>) {
        self.store.set_state(update);
    }

    /// Merge a partial value.
    pub fn set(&self, partial: S::Partial) {
        self.store.set_state(Update::partial(partial));
    }

    /// Merge the partial computed from the current state.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&S) -> S::Partial + Send + 'static,
    {
        self.store.set_state(Update::with(f));
    }

    /// Subscribe to `(previous, next)` pairs.
    ///
    /// Both states are read when the callback fires, not when it was
    /// registered. An immediate call sees the latest previous/current pair.
    pub fn subscribe<F>(&self, callback: F, call_immediately: bool) -> Unsubscribe
    where
        F: Fn(&S, &S) + Send + Sync + 'static,
    {
        let store = Arc::downgrade(&self.store);
        let listener: Listener = Arc::new(move || {
            if let Some(store) = store.upgrade() {
                let prev = store.get_prev_state();
                let next = store.get_snapshot();
                callback(&prev, &next);
            }
        });

        self.store.subscribe_listener(listener, call_immediately)
    }

    /// Subscribe using the configured default, which fires immediately
    /// unless the store was configured otherwise.
    pub fn subscribe_default<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&S, &S) + Send + Sync + 'static,
    {
        self.subscribe(callback, self.config.accessor_call_immediately)
    }

    /// Get the underlying store.
    pub fn store(&self) -> &Arc<Store<S>> {
        &self.store
    }

    /// Get the configuration the store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl<S> ExternalStore<S> for StoreHandle<S>
where
    S: Merge,
{
    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        self.store.subscribe_listener(listener, false)
    }

    fn get_snapshot(&self) -> Arc<S> {
        self.store.get_snapshot()
    }

    fn store_id(&self) -> StoreId {
        self.store.id()
    }

    fn snapshot_reader(&self) -> SnapshotReader<S> {
        self.store.snapshot_reader()
    }
}

impl<S> Clone for StoreHandle<S>
where
    S: Merge,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> fmt::Debug for StoreHandle<S>
where
    S: Merge + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("store", &self.store)
            .finish()
    }
}

/// Build a store from an initializer that receives a bound setter.
///
/// The initializer runs exactly once.
pub fn create_store<S, I>(initializer: I) -> StoreHandle<S>
where
    S: Merge + Send + Sync + 'static,
    I: FnOnce(Setter<S>) -> S,
{
    create_store_with(StoreConfig::default(), initializer)
}

/// Build a store with explicit configuration.
pub fn create_store_with<S, I>(config: StoreConfig, initializer: I) -> StoreHandle<S>
where
    S: Merge + Send + Sync + 'static,
    I: FnOnce(Setter<S>) -> S,
{
    let setter = Setter::unbound(config.display_name());
    let initial = initializer(setter.clone());

    let store = Arc::new(Store::with_name(config.display_name(), initial));
    setter.bind(&store);

    StoreHandle {
        store,
        config: Arc::new(config),
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
    fn initializer_runs_once() {
        let runs = AtomicI32::new(0);
        let handle = create_store(|_set| {
            runs.fetch_add(1, Ordering::SeqCst);
            counter(0)
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(handle.get_state()["count"], 0);
    }

    #[test]
    fn setter_is_bound_after_construction() {
        let captured = Mutex::new(None);
        let handle = create_store(|set: Setter<State>| {
            assert!(!set.is_bound());
            *captured.lock() = Some(set);
            counter(0)
        });

        let set = captured.lock().take().unwrap();
        assert!(set.is_bound());

        set.set(counter(4)).unwrap();
        assert_eq!(handle.get_state()["count"], 4);
    }

    #[test]
    fn setter_inside_initializer_is_unbound() {
        let handle = create_store_with(StoreConfig::named("early"), |set: Setter<State>| {
            let err = set.set(counter(1)).unwrap_err();
            assert_eq!(err, StoreError::Unbound("early".into()));
            counter(0)
        });

        assert_eq!(handle.get_state()["count"], 0);
    }

    #[test]
    fn setter_after_release_errors() {
        let captured = Mutex::new(None);
        let handle = create_store(|set: Setter<State>| {
            *captured.lock() = Some(set);
            counter(0)
        });
        let set = captured.lock().take().unwrap();

        drop(handle);
        assert_eq!(
            set.set(counter(1)),
            Err(StoreError::Released("anonymous".into()))
        );
    }

    #[test]
    fn accessor_forwards_to_store() {
        let handle = create_store(|_| counter(0));
        handle.set_state(Update::partial(counter(10)));
        assert_eq!(handle.get_state()["count"], 10);
        assert_eq!(handle.store().get_prev_state()["count"], 0);

        handle.update(|s: &State| counter(s["count"] * 2));
        assert_eq!(handle.get_state()["count"], 20);
    }

    #[test]
    fn accessor_subscribe_passes_prev_and_next() {
        let handle = create_store(|_| counter(0));
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();

        handle.subscribe(
            move |prev: &State, next: &State| log_clone.lock().push((prev["count"], next["count"])),
            false,
        );

        handle.set(counter(1));
        handle.set(counter(5));
        assert_eq!(*log.lock(), vec![(0, 1), (1, 5)]);
    }

    #[test]
    fn subscribe_default_fires_immediately() {
        let handle = create_store(|_| counter(7));
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        handle.subscribe_default(move |prev: &State, next: &State| {
            assert_eq!(prev["count"], 7);
            assert_eq!(next["count"], 7);
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribe_default_follows_config() {
        let handle = create_store_with(
            StoreConfig::default().with_accessor_call_immediately(false),
            |_| counter(0),
        );
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        handle.subscribe_default(move |_: &State, _: &State| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        handle.set(counter(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handle_clone_shares_store() {
        let handle1 = create_store(|_| counter(0));
        let handle2 = handle1.clone();

        handle1.set(counter(42));
        assert_eq!(handle2.get_state()["count"], 42);
        assert!(Arc::ptr_eq(handle1.store(), handle2.store()));
    }
}
