//! Errors returned by the state container.

use crate::subscription::SubscriptionId;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while wiring up or driving a [`Machine`](crate::Machine).
///
/// Everything except [`MachineError::SubscribersFailed`] is a caller-contract
/// violation and is reported at the call that caused it.
#[derive(Debug, Error)]
pub enum MachineError {
    /// `initialize` was called on a machine that already holds a state.
    #[error("State already initialized")]
    AlreadyInitialized,

    /// The machine was used before `initialize`.
    #[error("State is not initialized")]
    NotInitialized,

    /// A type-erased value was dispatched that is not this machine's action type.
    #[error("Dispatched value is not an action of type {expected}")]
    NotAnAction { expected: &'static str },

    /// A reducer is already registered for this action kind.
    #[error("Reducer already registered for action kind {kind}")]
    DuplicateRegistration { kind: String },

    /// No reducer is registered for the dispatched action's kind.
    #[error("Action of kind {kind} not registered")]
    ActionNotRegistered { kind: String },

    /// The new state was committed but one or more subscribers failed.
    #[error("{} subscriber(s) failed after commit", failures.len())]
    SubscribersFailed { failures: Vec<SubscriberFailure> },
}

impl MachineError {
    pub(crate) fn duplicate(kind: &impl fmt::Debug) -> Self {
        Self::DuplicateRegistration {
            kind: format!("{:?}", kind),
        }
    }

    pub(crate) fn not_registered(kind: &impl fmt::Debug) -> Self {
        Self::ActionNotRegistered {
            kind: format!("{:?}", kind),
        }
    }
}

/// A single subscriber failure collected during notification fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailure {
    pub subscription: SubscriptionId,
    pub message: String,
}

impl fmt::Display for SubscriberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber {}: {}", self.subscription, self.message)
    }
}
