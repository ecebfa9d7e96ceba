//! Action registry
//!
//! Maps an action kind to the reducer responsible for it. A kind holds either
//! a full-state reducer or a projected reducer, never both, and a kind is never
//! silently overwritten.

use crate::action::Action;
use crate::error::MachineError;
use crate::projection::Projection;
use std::collections::HashMap;
use std::sync::Arc;

type FullReducer<S, A> = Arc<dyn Fn(&A, S) -> S + Send + Sync>;

/// Type-erased projected reducer so the registry does not depend on the
/// sub-value type.
pub(crate) trait ProjectedReduce<S, A>: Send + Sync {
    fn reduce(&self, action: &A, state: &S) -> S;
}

struct ProjectedReducer<S, T, F> {
    projection: Projection<S, T>,
    partial: F,
}

impl<S, T, A, F> ProjectedReduce<S, A> for ProjectedReducer<S, T, F>
where
    S: Clone,
    T: Clone,
    F: Fn(&A, T) -> T + Send + Sync,
{
    fn reduce(&self, action: &A, state: &S) -> S {
        self.projection.update(state, |part| (self.partial)(action, part))
    }
}

/// A registered reducer in one of its two forms.
pub(crate) enum Reducer<S, A> {
    Full(FullReducer<S, A>),
    Projected(Arc<dyn ProjectedReduce<S, A>>),
}

impl<S, A> Clone for Reducer<S, A> {
    fn clone(&self) -> Self {
        match self {
            Self::Full(f) => Self::Full(Arc::clone(f)),
            Self::Projected(p) => Self::Projected(Arc::clone(p)),
        }
    }
}

impl<S: Clone, A> Reducer<S, A> {
    /// Produce the next state from a borrowed committed state.
    ///
    /// The reducer never sees `state` itself, only a clone of it (or of the
    /// projected part).
    pub(crate) fn apply(&self, action: &A, state: &S) -> S {
        match self {
            Self::Full(reduce) => reduce(action, state.clone()),
            Self::Projected(projected) => projected.reduce(action, state),
        }
    }
}

/// Which form a kind is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducerForm {
    Full,
    Projected,
}

/// Registry of reducers keyed by action kind.
pub struct ActionRegistry<S, A: Action> {
    reducers: HashMap<A::Kind, Reducer<S, A>>,
}

impl<S, A> ActionRegistry<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    pub fn new() -> Self {
        Self {
            reducers: HashMap::new(),
        }
    }

    /// Register a full-state reducer for `kind`.
    ///
    /// Fails with [`MachineError::DuplicateRegistration`] if `kind` already has
    /// a reducer of either form; the existing one stays active.
    pub fn register<F>(&mut self, kind: A::Kind, reducer: F) -> Result<(), MachineError>
    where
        F: Fn(&A, S) -> S + Send + Sync + 'static,
    {
        self.insert(kind, Reducer::Full(Arc::new(reducer)))
    }

    /// Register a reducer scoped to the sub-value addressed by `projection`.
    ///
    /// On dispatch the selected part is cloned and handed to `partial`; the
    /// result is spliced into a clone of the full state.
    pub fn register_projected<T, F>(
        &mut self,
        kind: A::Kind,
        projection: Projection<S, T>,
        partial: F,
    ) -> Result<(), MachineError>
    where
        T: Clone + 'static,
        F: Fn(&A, T) -> T + Send + Sync + 'static,
    {
        let projected = ProjectedReducer {
            projection,
            partial,
        };
        self.insert(kind, Reducer::Projected(Arc::new(projected)))
    }

    fn insert(&mut self, kind: A::Kind, reducer: Reducer<S, A>) -> Result<(), MachineError> {
        if self.reducers.contains_key(&kind) {
            return Err(MachineError::duplicate(&kind));
        }

        log::debug!("Registered reducer for {:?}", kind);
        self.reducers.insert(kind, reducer);
        Ok(())
    }

    /// Remove the reducer for `kind`, whichever form it has.
    ///
    /// Removing an unknown kind is a no-op. Returns whether anything was removed.
    pub fn deregister(&mut self, kind: A::Kind) -> bool {
        let removed = self.reducers.remove(&kind).is_some();
        if removed {
            log::debug!("Deregistered reducer for {:?}", kind);
        }
        removed
    }

    pub fn contains(&self, kind: A::Kind) -> bool {
        self.reducers.contains_key(&kind)
    }

    pub fn form(&self, kind: A::Kind) -> Option<ReducerForm> {
        self.reducers.get(&kind).map(|reducer| match reducer {
            Reducer::Full(_) => ReducerForm::Full,
            Reducer::Projected(_) => ReducerForm::Projected,
        })
    }

    pub fn kinds(&self) -> Vec<A::Kind> {
        self.reducers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }

    pub(crate) fn lookup(&self, kind: A::Kind) -> Option<Reducer<S, A>> {
        self.reducers.get(&kind).cloned()
    }
}

impl<S, A> Default for ActionRegistry<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    fn default() -> Self {
        Self::new()
    }
}
