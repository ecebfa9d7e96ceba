//! The action marker trait
//!
//! Every value dispatched to a [`Machine`](crate::Machine) implements [`Action`].
//! An action exposes a *kind*, a small copyable tag that identifies which
//! reducer handles it. For enum actions the kind is usually the variant tag,
//! which `strum::EnumDiscriminants` can derive:
//!
//! ```rust,ignore
//! #[derive(Debug, Clone, EnumDiscriminants)]
//! #[strum_discriminants(name(CounterActionKind), derive(Hash))]
//! enum CounterAction {
//!     Increment,
//!     Rename(String),
//! }
//!
//! impl Action for CounterAction {
//!     type Kind = CounterActionKind;
//!
//!     fn kind(&self) -> CounterActionKind {
//!         self.into()
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::hash::Hash;

/// Marker for values that can be dispatched to a machine.
///
/// The container only ever reads an action; it never stores or mutates it.
pub trait Action: Debug + Send + Sync + 'static {
    /// Registry key identifying the reducer for this action.
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// The stable kind of this action instance.
    fn kind(&self) -> Self::Kind;
}
