//! Actions understood by the playground machine
//!
//! The action kind is the variant tag, derived with `strum`.

use machine::Action;
use strum::EnumDiscriminants;

#[derive(Debug, Clone, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(PlaygroundActionKind), derive(Hash))]
pub enum PlaygroundAction {
    /// Increase the top-level counter by one
    Increment,
    /// Append the name to itself
    Add,
    /// Replace the name
    Rename(String),
    /// Double the nested counter (projected reducer)
    DoubleNested,
    /// Return the state unchanged
    Noop,
}

impl Action for PlaygroundAction {
    type Kind = PlaygroundActionKind;

    fn kind(&self) -> PlaygroundActionKind {
        self.into()
    }
}
