use crate::action::Action;
use crate::error::MachineError;
use crate::projection::Projection;
use crate::registry::{ActionRegistry, ReducerForm};
use crate::subscription::{notify, NotifyPolicy, Subscribers, Subscription};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::{
    Arc, Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

/// Tunables for a [`Machine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineOptions {
    #[serde(default)]
    pub notify_policy: NotifyPolicy,
}

/// Machine - holds a single state value and manages the Redux loop
///
/// A machine owns exactly one state of type `S` once initialized. State only
/// changes through [`dispatch`](Machine::dispatch), which looks up the reducer
/// registered for the action's kind, runs it on a clone of the committed
/// state, commits the result and notifies subscribers.
///
/// Create one machine per state type and share it by reference or `Arc`:
///
/// ```rust
/// use machine::{Action, Machine};
///
/// #[derive(Debug)]
/// struct Add;
///
/// impl Action for Add {
///     type Kind = ();
///
///     fn kind(&self) -> Self::Kind {}
/// }
///
/// let machine = Machine::<String, Add>::new();
/// machine.initialize("s".to_string()).unwrap();
/// machine.register((), |_, s| format!("{s}{s}")).unwrap();
///
/// assert_eq!(machine.dispatch(&Add).unwrap(), "ss");
/// assert_eq!(machine.dispatch(&Add).unwrap(), "ssss");
/// ```
///
/// # Concurrency
///
/// Dispatches on one machine are serialized: clone, reduce, commit and notify
/// run as one critical section, so subscribers see commits in dispatch order.
/// The state itself is only locked to read it and to commit, so reducers and
/// subscribers may call [`get_state`](Machine::get_state). A reducer or
/// subscriber that dispatches back into the same machine deadlocks, and a
/// reducer that never returns blocks every later dispatch.
pub struct Machine<S, A: Action> {
    state: OnceLock<RwLock<S>>,
    dispatch_lock: Mutex<()>,
    registry: RwLock<ActionRegistry<S, A>>,
    subscribers: RwLock<Subscribers<S>>,
    options: MachineOptions,
}

impl<S, A> Machine<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    /// Create an uninitialized machine with default options.
    pub fn new() -> Self {
        Self::with_options(MachineOptions::default())
    }

    pub fn with_options(options: MachineOptions) -> Self {
        Self {
            state: OnceLock::new(),
            dispatch_lock: Mutex::new(()),
            registry: RwLock::new(ActionRegistry::new()),
            subscribers: RwLock::new(Subscribers::new()),
            options,
        }
    }

    pub fn options(&self) -> MachineOptions {
        self.options
    }

    /// Set the initial state.
    ///
    /// Only the first call succeeds, including under concurrent callers;
    /// every later call fails with [`MachineError::AlreadyInitialized`] and
    /// leaves the first state in place.
    pub fn initialize(&self, default_state: S) -> Result<&Self, MachineError> {
        self.state
            .set(RwLock::new(default_state))
            .map_err(|_| MachineError::AlreadyInitialized)?;

        log::info!("Initialized machine for {}", type_name::<S>());
        Ok(self)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Get a copy of the committed state.
    pub fn get_state(&self) -> Result<S, MachineError> {
        self.with_state(S::clone)
    }

    /// Read the committed state without copying it.
    ///
    /// The state is read-locked for the duration of `f`, which holds back the
    /// next commit. Keep it short and never dispatch from inside it.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> Result<R, MachineError> {
        let state = self.read_state()?;
        Ok(f(&state))
    }

    /// Register a full-state reducer for `kind`.
    pub fn register<F>(&self, kind: A::Kind, reducer: F) -> Result<(), MachineError>
    where
        F: Fn(&A, S) -> S + Send + Sync + 'static,
    {
        self.registry_mut().register(kind, reducer)
    }

    /// Register a reducer for `kind` that only sees the part of the state
    /// addressed by `projection`.
    pub fn register_projected<T, F>(
        &self,
        kind: A::Kind,
        projection: Projection<S, T>,
        partial: F,
    ) -> Result<(), MachineError>
    where
        T: Clone + 'static,
        F: Fn(&A, T) -> T + Send + Sync + 'static,
    {
        self.registry_mut()
            .register_projected(kind, projection, partial)
    }

    /// Remove the reducer for `kind`. Unknown kinds are ignored.
    pub fn deregister(&self, kind: A::Kind) -> bool {
        self.registry_mut().deregister(kind)
    }

    pub fn is_registered(&self, kind: A::Kind) -> bool {
        self.registry().contains(kind)
    }

    pub fn registered_form(&self, kind: A::Kind) -> Option<ReducerForm> {
        self.registry().form(kind)
    }

    /// Dispatch an action and return the newly committed state.
    ///
    /// If subscribers fail after the commit, the state stays committed and
    /// [`MachineError::SubscribersFailed`] is returned instead.
    pub fn dispatch(&self, action: &A) -> Result<S, MachineError> {
        let kind = action.kind();
        let cell = self.state.get().ok_or(MachineError::NotInitialized)?;
        let reducer = self
            .registry()
            .lookup(kind)
            .ok_or_else(|| MachineError::not_registered(&kind))?;

        // A reducer panic poisons this lock before anything is committed.
        let serial = self
            .dispatch_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let next = {
            let current = cell.read().unwrap_or_else(PoisonError::into_inner);
            reducer.apply(action, &current)
        };
        *cell.write().unwrap_or_else(PoisonError::into_inner) = next.clone();
        log::debug!("Committed state after {:?}", action);

        let subscribers = self.subscribers().snapshot();
        let failures = notify(&subscribers, &next, self.options.notify_policy);
        drop(serial);

        if failures.is_empty() {
            Ok(next)
        } else {
            Err(MachineError::SubscribersFailed { failures })
        }
    }

    /// Dispatch a type-erased value.
    ///
    /// Fails with [`MachineError::NotAnAction`] if `value` is not an `A`.
    pub fn dispatch_any(&self, value: &dyn Any) -> Result<S, MachineError> {
        let action = value
            .downcast_ref::<A>()
            .ok_or(MachineError::NotAnAction {
                expected: type_name::<A>(),
            })?;
        self.dispatch(action)
    }

    /// Subscribe to state changes.
    ///
    /// Subscribers run synchronously after every commit, in the order they
    /// subscribed. The next dispatch waits until every subscriber returned.
    pub fn subscribe<F>(&self, on_state_changed: F) -> Subscription
    where
        F: Fn(&S) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let subscription = self.subscribers_mut().add(Arc::new(on_state_changed));
        log::debug!("Added subscriber {}", subscription.id());
        subscription
    }

    /// Returns `false` if the subscription was not found.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let removed = self.subscribers_mut().remove(&subscription);
        if removed {
            log::debug!("Removed subscriber {}", subscription.id());
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, S>, MachineError> {
        let cell = self.state.get().ok_or(MachineError::NotInitialized)?;
        Ok(cell.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn registry(&self) -> RwLockReadGuard<'_, ActionRegistry<S, A>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn registry_mut(&self) -> RwLockWriteGuard<'_, ActionRegistry<S, A>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers(&self) -> RwLockReadGuard<'_, Subscribers<S>> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers_mut(&self) -> RwLockWriteGuard<'_, Subscribers<S>> {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, A> Default for Machine<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> fmt::Debug for Machine<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Action,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("state", &type_name::<S>())
            .field("initialized", &self.is_initialized())
            .field("reducers", &self.registry().len())
            .field("subscribers", &self.subscriber_count())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use strum::EnumDiscriminants;

    #[derive(Debug, Clone, PartialEq)]
    struct Nested {
        count: i64,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TestState {
        count: i64,
        name: String,
        nested: Nested,
    }

    impl TestState {
        fn new() -> Self {
            Self {
                count: 1,
                name: "s".to_string(),
                nested: Nested { count: 42 },
            }
        }
    }

    #[derive(Debug, EnumDiscriminants)]
    #[strum_discriminants(name(TestActionKind), derive(Hash))]
    enum TestAction {
        Increment,
        Add,
        Identity,
        DoubleNested,
        Boom,
        Unregistered,
    }

    impl Action for TestAction {
        type Kind = TestActionKind;

        fn kind(&self) -> TestActionKind {
            self.into()
        }
    }

    fn nested_count() -> Projection<TestState, i64> {
        Projection::new(
            |s: &TestState| &s.nested.count,
            |s: TestState, count| TestState {
                nested: Nested { count },
                ..s
            },
        )
    }

    fn machine() -> Machine<TestState, TestAction> {
        let machine = Machine::new();
        machine.initialize(TestState::new()).unwrap();
        machine
            .register(TestActionKind::Increment, |_, mut s: TestState| {
                s.count += 1;
                s
            })
            .unwrap();
        machine
            .register(TestActionKind::Add, |_, mut s: TestState| {
                s.name = format!("{}{}", s.name, s.name);
                s
            })
            .unwrap();
        machine
            .register(TestActionKind::Identity, |_, s| s)
            .unwrap();
        machine
            .register_projected(TestActionKind::DoubleNested, nested_count(), |_, c| c * 2)
            .unwrap();
        machine
    }

    #[test]
    fn test_uninitialized_machine_rejects_use() {
        let machine = Machine::<TestState, TestAction>::new();
        machine
            .register(TestActionKind::Identity, |_, s| s)
            .unwrap();

        assert!(!machine.is_initialized());
        assert!(matches!(
            machine.get_state(),
            Err(MachineError::NotInitialized)
        ));
        assert!(matches!(
            machine.dispatch(&TestAction::Identity),
            Err(MachineError::NotInitialized)
        ));
    }

    #[test]
    fn test_initialize_twice_keeps_first_state() {
        let machine = Machine::<TestState, TestAction>::new();
        machine.initialize(TestState::new()).unwrap();

        let mut other = TestState::new();
        other.name = "other".to_string();
        assert!(matches!(
            machine.initialize(other),
            Err(MachineError::AlreadyInitialized)
        ));
        assert_eq!(machine.get_state().unwrap(), TestState::new());
    }

    #[test]
    fn test_concurrent_initialize_has_one_winner() {
        let machine = Machine::<i64, TestAction>::new();

        let winners: Vec<i64> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8_i64)
                .map(|n| {
                    let machine = &machine;
                    scope.spawn(move || machine.initialize(n).ok().map(|_| n))
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .collect()
        });

        assert_eq!(winners.len(), 1);
        assert_eq!(machine.get_state().unwrap(), winners[0]);
    }

    #[test]
    fn test_add_doubles_name() {
        let machine = machine();

        assert_eq!(machine.dispatch(&TestAction::Add).unwrap().name, "ss");
        assert_eq!(machine.dispatch(&TestAction::Add).unwrap().name, "ssss");
        assert_eq!(machine.get_state().unwrap().name, "ssss");
    }

    #[test]
    fn test_identity_reducer_leaves_state_equal() {
        let machine = machine();
        let before = machine.get_state().unwrap();

        let after = machine.dispatch(&TestAction::Identity).unwrap();

        assert_eq!(after, before);
        assert_eq!(machine.get_state().unwrap(), before);
    }

    #[test]
    fn test_projected_reducer_splices_nested_value() {
        let machine = machine();

        let state = machine.dispatch(&TestAction::DoubleNested).unwrap();

        assert_eq!(
            state,
            TestState {
                count: 1,
                name: "s".to_string(),
                nested: Nested { count: 84 },
            }
        );
        assert_eq!(
            machine.registered_form(TestActionKind::DoubleNested),
            Some(ReducerForm::Projected)
        );
    }

    #[test]
    fn test_unregistered_action_leaves_state_unchanged() {
        let machine = machine();
        machine.dispatch(&TestAction::Increment).unwrap();

        let err = machine.dispatch(&TestAction::Unregistered).unwrap_err();

        assert!(matches!(
            err,
            MachineError::ActionNotRegistered { ref kind } if kind == "Unregistered"
        ));
        assert_eq!(machine.get_state().unwrap().count, 2);
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let machine = machine();

        let err = machine
            .register(TestActionKind::Increment, |_, mut s: TestState| {
                s.count += 100;
                s
            })
            .unwrap_err();
        assert!(matches!(err, MachineError::DuplicateRegistration { .. }));

        let err = machine
            .register_projected(TestActionKind::Add, nested_count(), |_, c| c)
            .unwrap_err();
        assert!(matches!(err, MachineError::DuplicateRegistration { .. }));

        assert_eq!(machine.dispatch(&TestAction::Increment).unwrap().count, 2);
    }

    #[test]
    fn test_deregister_then_dispatch_fails() {
        let machine = machine();

        assert!(machine.deregister(TestActionKind::Add));
        assert!(machine.deregister(TestActionKind::DoubleNested));
        assert!(!machine.deregister(TestActionKind::Add));

        assert!(matches!(
            machine.dispatch(&TestAction::Add),
            Err(MachineError::ActionNotRegistered { .. })
        ));
        assert!(matches!(
            machine.dispatch(&TestAction::DoubleNested),
            Err(MachineError::ActionNotRegistered { .. })
        ));
        assert!(!machine.is_registered(TestActionKind::Add));
    }

    #[test]
    fn test_concurrent_dispatch_loses_no_updates() {
        let machine = machine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let _subscription = machine.subscribe(move |s: &TestState| {
            recorder.lock().unwrap().push(s.count);
            Ok(())
        });

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        machine.dispatch(&TestAction::Increment).unwrap();
                    }
                });
            }
        });

        assert_eq!(machine.get_state().unwrap().count, 1 + 8 * 250);

        // Notifications arrive in commit order.
        let seen = seen.lock().unwrap();
        let expected: Vec<i64> = (2..=1 + 8 * 250).collect();
        assert_eq!(*seen, expected);
    }

    #[test]
    fn test_subscribers_notified_in_order() {
        let machine = machine();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let a = Arc::clone(&seen);
        let _a = machine.subscribe(move |s: &TestState| {
            a.lock().unwrap().push(format!("a:{}", s.count));
            Ok(())
        });
        let b = Arc::clone(&seen);
        let _b = machine.subscribe(move |s: &TestState| {
            b.lock().unwrap().push(format!("b:{}", s.count));
            Ok(())
        });

        machine.dispatch(&TestAction::Increment).unwrap();
        machine.dispatch(&TestAction::Increment).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["a:2", "b:2", "a:3", "b:3"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let machine = machine();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        let subscription = machine.subscribe(move |_: &TestState| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        machine.dispatch(&TestAction::Increment).unwrap();
        assert!(machine.unsubscribe(subscription));
        machine.dispatch(&TestAction::Increment).unwrap();

        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(machine.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_can_read_committed_state() {
        let machine = Arc::new(machine());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let weak = Arc::downgrade(&machine);
        let recorder = Arc::clone(&seen);
        let _reader = machine.subscribe(move |_: &TestState| {
            if let Some(machine) = weak.upgrade() {
                let count = machine.get_state()?.count;
                let name = machine.with_state(|s| s.name.clone())?;
                recorder.lock().unwrap().push((count, name));
            }
            Ok(())
        });

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&machine);
        thread::spawn(move || {
            let _ = tx.send(worker.dispatch(&TestAction::Increment).map(|s| s.count));
        });

        let committed = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("dispatch did not return")
            .unwrap();
        assert_eq!(committed, 2);
        assert_eq!(*seen.lock().unwrap(), vec![(2, "s".to_string())]);
    }

    #[test]
    fn test_subscriber_can_unsubscribe_during_fan_out() {
        let machine = Arc::new(machine());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let own_handle: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&machine);
        let handle = Arc::clone(&own_handle);
        let recorder = Arc::clone(&seen);
        let first = machine.subscribe(move |s: &TestState| {
            recorder.lock().unwrap().push(format!("first:{}", s.count));
            let Some(machine) = weak.upgrade() else {
                return Ok(());
            };
            let late = Arc::clone(&recorder);
            let _late = machine.subscribe(move |s: &TestState| {
                late.lock().unwrap().push(format!("late:{}", s.count));
                Ok(())
            });
            if let Some(own) = handle.lock().unwrap().take() {
                assert!(machine.unsubscribe(own));
            }
            Ok(())
        });
        *own_handle.lock().unwrap() = Some(first);

        let recorder = Arc::clone(&seen);
        let _second = machine.subscribe(move |s: &TestState| {
            recorder.lock().unwrap().push(format!("second:{}", s.count));
            Ok(())
        });

        machine.dispatch(&TestAction::Increment).unwrap();
        // the list changed mid fan-out, the first dispatch still reached both
        assert_eq!(*seen.lock().unwrap(), vec!["first:2", "second:2"]);

        machine.dispatch(&TestAction::Increment).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:2", "second:2", "second:3", "late:3"]
        );
        assert_eq!(machine.subscriber_count(), 2);
    }

    #[test]
    fn test_failing_subscriber_is_isolated() {
        let machine = machine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _bad = machine.subscribe(|_: &TestState| anyhow::bail!("observer down"));
        let recorder = Arc::clone(&seen);
        let _good = machine.subscribe(move |s: &TestState| {
            recorder.lock().unwrap().push(s.count);
            Ok(())
        });

        let err = machine.dispatch(&TestAction::Increment).unwrap_err();

        match err {
            MachineError::SubscribersFailed { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].message, "observer down");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*seen.lock().unwrap(), vec![2]);
        assert_eq!(machine.get_state().unwrap().count, 2);
    }

    #[test]
    fn test_fail_fast_skips_remaining_subscribers() {
        let machine = Machine::<TestState, TestAction>::with_options(MachineOptions {
            notify_policy: NotifyPolicy::FailFast,
        });
        machine.initialize(TestState::new()).unwrap();
        machine
            .register(TestActionKind::Identity, |_, s| s)
            .unwrap();

        let reached = Arc::new(Mutex::new(false));
        let _bad = machine.subscribe(|_: &TestState| -> anyhow::Result<()> {
            panic!("subscriber panicked")
        });
        let flag = Arc::clone(&reached);
        let _skipped = machine.subscribe(move |_: &TestState| {
            *flag.lock().unwrap() = true;
            Ok(())
        });

        assert!(matches!(
            machine.dispatch(&TestAction::Identity),
            Err(MachineError::SubscribersFailed { ref failures }) if failures.len() == 1
        ));
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn test_reducer_panic_leaves_state_intact() {
        let machine = machine();
        machine
            .register(TestActionKind::Boom, |_, _: TestState| panic!("reducer failed"))
            .unwrap();
        machine.dispatch(&TestAction::Increment).unwrap();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            machine.dispatch(&TestAction::Boom)
        }));

        assert!(outcome.is_err());
        assert_eq!(machine.get_state().unwrap().count, 2);
        assert_eq!(machine.dispatch(&TestAction::Increment).unwrap().count, 3);
    }

    #[test]
    fn test_reducer_receives_a_clone() {
        let machine = machine();
        let observed = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&observed);
        machine
            .register(TestActionKind::Boom, move |_, mut s: TestState| {
                s.name.push('!');
                *slot.lock().unwrap() = Some(s.clone());
                s.name.clear();
                s
            })
            .unwrap();

        let before = machine.get_state().unwrap();
        machine.dispatch(&TestAction::Boom).unwrap();

        let observed = observed.lock().unwrap().clone().unwrap();
        assert_eq!(observed.name, "s!");
        assert_eq!(before.name, "s");
        assert_eq!(machine.get_state().unwrap().name, "");
    }

    #[test]
    fn test_dispatch_any_rejects_foreign_values() {
        let machine = machine();

        assert_eq!(
            machine.dispatch_any(&TestAction::Increment).unwrap().count,
            2
        );

        let err = machine.dispatch_any(&"Increment").unwrap_err();
        assert!(matches!(err, MachineError::NotAnAction { .. }));
        assert_eq!(machine.get_state().unwrap().count, 2);
    }

    #[test]
    fn test_with_state_reads_without_cloning() {
        let machine = machine();
        let len = machine.with_state(|s| s.name.len()).unwrap();
        assert_eq!(len, 1);
    }

    #[test]
    fn test_debug_summarizes_machine() {
        let machine = machine();
        let rendered = format!("{:?}", machine);
        assert!(rendered.contains("initialized: true"));
        assert!(rendered.contains("reducers: 4"));
    }
}
