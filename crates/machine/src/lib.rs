//! # machine
//!
//! A Redux-style state container: one state value per machine, changed only
//! by reducers registered per action kind, with synchronous change
//! notification.
//!
//! ## Model
//!
//! - [`Machine`] owns the state and serializes [`dispatch`](Machine::dispatch)
//! - [`ActionRegistry`] maps an [`Action`] kind to a full or projected reducer
//! - [`Projection`] scopes a reducer to a sub-value and splices the result back
//! - subscribers observe every committed state, in subscription order
//!
//! ## Usage
//!
//! ```rust,ignore
//! let machine = Machine::<AppState, AppAction>::new();
//! machine.initialize(AppState::default())?;
//!
//! machine.register(AppActionKind::Increment, |_, mut state| {
//!     state.count += 1;
//!     state
//! })?;
//! machine.register_projected(AppActionKind::DoubleNested, nested_count(), |_, c| c * 2)?;
//!
//! let _subscription = machine.subscribe(|state| {
//!     log::info!("state changed: {:?}", state);
//!     Ok(())
//! });
//!
//! let state = machine.dispatch(&AppAction::Increment)?;
//! ```

mod action;
mod error;
mod machine;
mod projection;
mod registry;
mod subscription;

pub use action::Action;
pub use error::{MachineError, SubscriberFailure};
pub use machine::{Machine, MachineOptions};
pub use projection::Projection;
pub use registry::{ActionRegistry, ReducerForm};
pub use subscription::{NotifyPolicy, Subscription, SubscriptionId};
