//! State updates.

use std::fmt;

use super::merge::Merge;

type Updater<S> = Box<dyn FnOnce(&S) -> <S as Merge>::Partial + Send>;

/// An update passed to [`Store::set_state`](super::Store::set_state).
///
/// Either a partial value to merge directly, or a function that computes the
/// partial from the state as it was before the update.
pub enum Update<S: Merge> {
    /// Merge this partial as-is.
    Partial(S::Partial),

    /// Compute the partial from the pre-update state.
    With(Updater<S>),
}

impl<S: Merge> Update<S> {
    /// Wrap a partial value.
    pub fn partial(partial: S::Partial) -> Self {
        Self::Partial(partial)
    }

    /// Wrap an updater function.
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> S::Partial + Send + 'static,
    {
        Self::With(Box::new(f))
    }

    /// Turn the update into a partial, calling the updater if there is one.
    ///
    /// A panicking updater unwinds straight through this call.
    pub fn resolve(self, current: &S) -> S::Partial {
        match self {
            Self::Partial(partial) => partial,
            Self::With(f) => f(current),
        }
    }

    /// Whether this update is computed from the current state.
    pub fn is_function(&self) -> bool {
        matches!(self, Self::With(_))
    }
}

impl<S: Merge> fmt::Debug for Update<S>
where
    S::Partial: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Partial(partial) => f.debug_tuple("Partial").field(partial).finish(),
            Self::With(_) => f.write_str("With(<fn>)"),
        }
    }
}
