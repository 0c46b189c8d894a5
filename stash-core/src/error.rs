//! Error types.
//!
//! The store itself never fails: merges are not validated and unsubscribing
//! twice is a no-op. The only fallible path is the deferred setter handed to
//! a store initializer, which may be invoked before the store exists or after
//! it has been dropped.

/// Errors produced by a [`Setter`](crate::store::Setter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The setter was called while the initializer was still running, so
    /// there is no store to forward the update to yet.
    #[error("setter called before store `{0}` was constructed")]
    Unbound(String),

    /// Every handle to the store has been dropped.
    #[error("store `{0}` has been released")]
    Released(String),
}

/// Result alias for fallible store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
