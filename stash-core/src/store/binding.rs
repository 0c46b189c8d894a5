//! Render Binding
//!
//! A [`Binding`] is a minimal [`RenderContext`]: it stands for one reactive
//! reader, such as a mounted component instance. A reader may read from
//! several stores; each store gets its own slot.
//!
//! # How Bindings Work
//!
//! 1. The first read of a store subscribes to it and keeps the subscription
//!    in that store's slot.
//!
//! 2. Every read pulls a fresh snapshot and remembers it in the slot as
//!    the last one rendered.
//!
//! 3. When a store notifies, the binding pulls that store's snapshot again
//!    and requests a re-render only if it is a different `Arc` from the one
//!    last rendered from the same store.
//!
//! 4. Disposing the binding, or dropping its last clone, unsubscribes from
//!    every store.
//!
//! Listeners hold the binding and the store weakly, so a live binding keeps
//! neither the store nor itself alive.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::external::{ExternalStore, RenderContext};
use super::listener::Unsubscribe;
use super::store::StoreId;

type Rendered = Arc<dyn Any + Send + Sync>;

fn same_snapshot<S: Send + Sync + 'static>(rendered: &Rendered, snapshot: &Arc<S>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(rendered) as *const (),
        Arc::as_ptr(snapshot) as *const (),
    )
}

/// Per-store bookkeeping.
#[derive(Default)]
struct Slot {
    subscription: Option<Unsubscribe>,
    last_rendered: Option<Rendered>,
}

struct BindingInner {
    slots: Mutex<IndexMap<StoreId, Slot>>,
    pending: AtomicUsize,
    disposed: AtomicBool,
}

impl BindingInner {
    fn on_change<S>(&self, store: StoreId, snapshot: Arc<S>)
    where
        S: Send + Sync + 'static,
    {
        let changed = match self.slots.lock().get(&store) {
            Some(Slot {
                last_rendered: Some(rendered),
                ..
            }) => !same_snapshot(rendered, &snapshot),
            _ => true,
        };

        if changed {
            self.pending.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn unsubscribe_all(slots: &mut IndexMap<StoreId, Slot>) {
        for slot in slots.values_mut() {
            if let Some(subscription) = slot.subscription.take() {
                subscription.unsubscribe();
            }
        }
    }
}

impl Drop for BindingInner {
    fn drop(&mut self) {
        Self::unsubscribe_all(self.slots.get_mut());
    }
}

/// One reactive reader of one or more external stores.
#[derive(Clone)]
pub struct Binding {
    inner: Arc<BindingInner>,
}

impl Binding {
    /// Create an unbound reader.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BindingInner {
                slots: Mutex::new(IndexMap::new()),
                pending: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Whether the reader currently holds any subscription.
    pub fn is_subscribed(&self) -> bool {
        self.subscription_count() > 0
    }

    /// Whether the reader currently holds a subscription to `source`.
    pub fn is_subscribed_to<S, E>(&self, source: &E) -> bool
    where
        E: ExternalStore<S> + ?Sized,
    {
        self.inner
            .slots
            .lock()
            .get(&source.store_id())
            .and_then(|slot| slot.subscription.as_ref())
            .map(Unsubscribe::is_active)
            .unwrap_or(false)
    }

    /// Number of stores the reader is subscribed to.
    pub fn subscription_count(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| slot.subscription.as_ref().is_some_and(Unsubscribe::is_active))
            .count()
    }

    /// Number of re-render requests since the last [`take_rerender`](Self::take_rerender).
    pub fn rerender_requests(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Consume pending re-render requests. Returns whether there were any.
    pub fn take_rerender(&self) -> bool {
        self.inner.pending.swap(0, Ordering::SeqCst) > 0
    }

    /// Drop every subscription. Later reads still return the current
    /// snapshot but do not subscribe again.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        BindingInner::unsubscribe_all(&mut self.inner.slots.lock());
    }

    /// Check if the binding has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl Default for Binding {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext for Binding {
    fn sync_external_store<S, E>(&self, source: &E) -> Arc<S>
    where
        S: Send + Sync + 'static,
        E: ExternalStore<S> + ?Sized,
    {
        let store = source.store_id();
        let mut slots = self.inner.slots.lock();
        let slot = slots.entry(store).or_default();

        if slot.subscription.is_none() && !self.is_disposed() {
            let weak: Weak<BindingInner> = Arc::downgrade(&self.inner);
            let reader = source.snapshot_reader();

            slot.subscription = Some(source.subscribe(Arc::new(move || {
                if let (Some(inner), Some(snapshot)) = (weak.upgrade(), reader.read()) {
                    inner.on_change(store, snapshot);
                }
            })));
        }

        let snapshot = source.get_snapshot();
        let rendered: Rendered = snapshot.clone();
        slot.last_rendered = Some(rendered);
        snapshot
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("subscriptions", &self.subscription_count())
            .field("rerender_requests", &self.rerender_requests())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
