//! Stash Core
//!
//! This crate provides a minimal external state store for reactive
//! renderers. It implements:
//!
//! - A store holding one state value and the value it last replaced
//! - Shallow-merge updates from partial values or updater functions
//! - Synchronous, ordered change listeners with copy-on-write registration
//! - A store factory whose initializer receives a deferred setter, so
//!   action handles stored inside the state can update it
//! - A subscribe/snapshot contract that any rendering layer can bind to
//!
//! # Architecture
//!
//! - `store`: the store, its listener registry, the factory and accessor,
//!   and the renderer contract
//! - `config`: options for named stores and accessor defaults
//! - `error`: errors raised by the deferred setter
//!
//! # Example
//!
//! ```rust
//! use indexmap::IndexMap;
//! use stash_core::{create_store, store::{Binding, Update}};
//!
//! type State = IndexMap<&'static str, i64>;
//!
//! let counter = create_store(|_set| IndexMap::from([("count", 0)]));
//!
//! // A reader bound to the store
//! let view = Binding::new();
//! assert_eq!(counter.use_selector(&view, |s: &State| s["count"]), 0);
//!
//! // Log every change as a (previous, next) pair
//! counter.subscribe(|prev: &State, next: &State| {
//!     println!("{} -> {}", prev["count"], next["count"]);
//! }, false);
//!
//! counter.set_state(Update::with(|s: &State| IndexMap::from([("count", s["count"] + 5)])));
//!
//! assert!(view.take_rerender());
//! assert_eq!(counter.use_store(&view)["count"], 5);
//! ```

pub mod config;
pub mod error;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use store::{create_store, create_store_with, Setter, Store, StoreHandle, Update};
