//! Store
//!
//! This module implements an external state container: one state value,
//! the value it most recently replaced, and a set of change listeners.
//!
//! # Concepts
//!
//! ## Store
//!
//! A [`Store`] owns its state exclusively. The only way to change it is
//! [`Store::set_state`], which shallow-merges a partial update onto the
//! current state and then calls every listener synchronously, in
//! registration order.
//!
//! ## Listeners
//!
//! Listeners take no arguments; they pull whatever they need from the store
//! when they run. The registry is copy-on-write, so subscribing or
//! unsubscribing from inside a listener never disturbs the pass in progress.
//!
//! ## Factory and Accessor
//!
//! [`create_store`] runs an initializer with a [`Setter`] that is bound to
//! the store once it exists, and returns a [`StoreHandle`]: the accessor
//! renderers and application code use to read, update, and subscribe.
//!
//! ## Renderers
//!
//! A renderer sees a store through [`ExternalStore`], a subscribe/snapshot
//! pair, and plugs in by implementing [`RenderContext`]. [`Binding`] is a
//! small implementation that tracks one reader.

mod merge;
mod update;
mod listener;
mod store;
mod external;
mod factory;
mod binding;

pub use merge::Merge;
pub use update::Update;
pub use listener::{Listener, ListenerId, Unsubscribe};
pub use store::{SnapshotReader, Store, StoreId};
pub use external::{ExternalStore, RenderContext};
pub use factory::{create_store, create_store_with, Setter, StoreHandle};
pub use binding::Binding;
