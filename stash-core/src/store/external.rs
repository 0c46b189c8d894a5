//! External source contract.
//!
//! A reactive renderer consumes a store through exactly two primitives: a
//! way to subscribe a zero-argument listener, and a way to pull the current
//! snapshot. The renderer subscribes once per reader, pulls a snapshot on
//! every render, and re-renders when the listener fires and the snapshot it
//! pulls is a different `Arc` from the one it last rendered.

use std::sync::Arc;

use super::listener::{Listener, Unsubscribe};
use super::merge::Merge;
use super::store::{SnapshotReader, Store, StoreId};

/// A subscribe/snapshot pair that a renderer can bind to.
pub trait ExternalStore<S> {
    /// Register a listener fired after every update. Not called immediately.
    fn subscribe(&self, listener: Listener) -> Unsubscribe;

    /// Get the current snapshot.
    fn get_snapshot(&self) -> Arc<S>;

    /// Identity of the underlying store, shared by every handle to it.
    fn store_id(&self) -> StoreId;

    /// A reader that does not keep the store alive. Listeners hold this
    /// instead of the source itself.
    fn snapshot_reader(&self) -> SnapshotReader<S>;
}

impl<S> ExternalStore<S> for Store<S>
where
    S: Merge,
{
    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        self.subscribe_listener(listener, false)
    }

    fn get_snapshot(&self) -> Arc<S> {
        Store::get_snapshot(self)
    }

    fn store_id(&self) -> StoreId {
        self.id()
    }

    fn snapshot_reader(&self) -> SnapshotReader<S> {
        Store::snapshot_reader(self)
    }
}

impl<S, E> ExternalStore<S> for Arc<E>
where
    E: ExternalStore<S> + ?Sized,
{
    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        (**self).subscribe(listener)
    }

    fn get_snapshot(&self) -> Arc<S> {
        (**self).get_snapshot()
    }

    fn store_id(&self) -> StoreId {
        (**self).store_id()
    }

    fn snapshot_reader(&self) -> SnapshotReader<S> {
        (**self).snapshot_reader()
    }
}

/// The rendering layer's side of the contract: one reactive reader.
///
/// Implementations must return the snapshot current at the time of the
/// call, never a cached one, and keep one subscription per source alive for
/// as long as the reader exists.
pub trait RenderContext {
    /// Bind to `source` if not already bound and return its current snapshot.
    fn sync_external_store<S, E>(&self, source: &E) -> Arc<S>
    where
        S: Send + Sync + 'static,
        E: ExternalStore<S> + ?Sized;
}
