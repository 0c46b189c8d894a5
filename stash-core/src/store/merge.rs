//! Shallow merge.
//!
//! A store never replaces its state wholesale. Every update is a partial
//! value whose fields overwrite the matching fields of the current state,
//! while every other field is carried over unchanged. The [`Merge`] trait
//! captures that operation for any state shape.
//!
//! Map-shaped state gets an implementation out of the box. Application
//! structs usually pair with a "patch" struct of `Option` fields:
//!
//! ```rust
//! use stash_core::store::Merge;
//!
//! #[derive(Clone)]
//! struct Profile { name: String, age: u32 }
//!
//! #[derive(Default)]
//! struct ProfilePatch { name: Option<String>, age: Option<u32> }
//!
//! impl Merge for Profile {
//!     type Partial = ProfilePatch;
//!
//!     fn merge(&self, patch: ProfilePatch) -> Self {
//!         Self {
//!             name: patch.name.unwrap_or_else(|| self.name.clone()),
//!             age: patch.age.unwrap_or(self.age),
//!         }
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A state shape that supports shallow merge of a partial update.
pub trait Merge: Sized {
    /// The partial update type. Its fields win over the current state.
    type Partial;

    /// Produce a new, fully merged value. `self` is left untouched.
    fn merge(&self, partial: Self::Partial) -> Self;
}

/// Existing keys keep their position; new keys are appended in the order
/// the partial lists them.
impl<K, V> Merge for IndexMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Partial = IndexMap<K, V>;

    fn merge(&self, partial: Self::Partial) -> Self {
        let mut merged = self.clone();
        merged.extend(partial);
        merged
    }
}

impl<K, V> Merge for HashMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Partial = HashMap<K, V>;

    fn merge(&self, partial: Self::Partial) -> Self {
        let mut merged = self.clone();
        merged.extend(partial);
        merged
    }
}

impl<K, V> Merge for BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    type Partial = BTreeMap<K, V>;

    fn merge(&self, partial: Self::Partial) -> Self {
        let mut merged = self.clone();
        merged.extend(partial);
        merged
    }
}

/// JSON objects merge one level deep, like a spread of two objects.
impl Merge for Map<String, Value> {
    type Partial = Map<String, Value>;

    fn merge(&self, partial: Self::Partial) -> Self {
        let mut merged = self.clone();
        merged.extend(partial);
        merged
    }
}
