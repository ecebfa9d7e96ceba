//! Change notification
//!
//! Subscribers are invoked synchronously, in subscription order, after every
//! committed state change. A subscriber reports failure by returning an error
//! or by panicking; either way the failure is contained here and reported
//! according to the configured [`NotifyPolicy`].

use crate::error::SubscriberFailure;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Callback invoked with the newly committed state.
pub(crate) type Subscriber<S> = Arc<dyn Fn(&S) -> anyhow::Result<()> + Send + Sync>;

/// Identifier of a subscription, unique per machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe again.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping the handle makes it impossible to unsubscribe"]
pub struct Subscription {
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// How failing subscribers affect the rest of a notification fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    /// Run every subscriber, collect failures, report them all afterwards.
    #[default]
    Isolate,
    /// Stop at the first failing subscriber and report only that failure.
    FailFast,
}

/// Ordered subscriber list owned by a machine.
pub(crate) struct Subscribers<S> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Subscriber<S>)>,
}

impl<S> Subscribers<S> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, subscriber: Subscriber<S>) -> Subscription {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, subscriber));
        Subscription { id }
    }

    /// Returns `false` if the subscription was already removed.
    pub(crate) fn remove(&mut self, subscription: &Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != subscription.id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Clone the current list so fan-out can run without holding the list lock.
    pub(crate) fn snapshot(&self) -> Vec<(SubscriptionId, Subscriber<S>)> {
        self.entries.clone()
    }
}

/// Invoke `subscribers` in order with `state`.
///
/// Returns the collected failures; empty means every subscriber succeeded.
pub(crate) fn notify<S>(
    subscribers: &[(SubscriptionId, Subscriber<S>)],
    state: &S,
    policy: NotifyPolicy,
) -> Vec<SubscriberFailure> {
    let mut failures = Vec::new();

    for (id, subscriber) in subscribers {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber(state)));

        let message = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };

        log::warn!("Subscriber {} failed: {}", id, message);
        failures.push(SubscriberFailure {
            subscription: *id,
            message,
        });

        if policy == NotifyPolicy::FailFast {
            break;
        }
    }

    failures
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}
