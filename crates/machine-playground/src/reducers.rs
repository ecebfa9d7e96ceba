//! Reducers - pure functions that produce new state from a state clone + action

use crate::actions::{PlaygroundAction, PlaygroundActionKind};
use crate::state::PlaygroundState;
use machine::{Machine, MachineError, Projection};

pub type PlaygroundMachine = Machine<PlaygroundState, PlaygroundAction>;

pub fn increment(_action: &PlaygroundAction, state: PlaygroundState) -> PlaygroundState {
    let count = state.count + 1;
    state.with_count(count)
}

pub fn add(_action: &PlaygroundAction, state: PlaygroundState) -> PlaygroundState {
    let name = state.name.repeat(2);
    state.with_name(name)
}

pub fn rename(action: &PlaygroundAction, state: PlaygroundState) -> PlaygroundState {
    match action {
        PlaygroundAction::Rename(name) => state.with_name(name.clone()),
        _ => state,
    }
}

pub fn noop(_action: &PlaygroundAction, state: PlaygroundState) -> PlaygroundState {
    state
}

/// Partial reducer for [`nested_count`]
pub fn double(_action: &PlaygroundAction, count: i64) -> i64 {
    count * 2
}

/// Projection onto `nested.count`
pub fn nested_count() -> Projection<PlaygroundState, i64> {
    Projection::new(
        |state: &PlaygroundState| &state.nested.count,
        |state: PlaygroundState, count| state.with_nested_count(count),
    )
}

/// Register one reducer per action kind
pub fn register_all(machine: &PlaygroundMachine) -> Result<(), MachineError> {
    machine.register(PlaygroundActionKind::Increment, increment)?;
    machine.register(PlaygroundActionKind::Add, add)?;
    machine.register(PlaygroundActionKind::Rename, rename)?;
    machine.register(PlaygroundActionKind::Noop, noop)?;
    machine.register_projected(PlaygroundActionKind::DoubleNested, nested_count(), double)?;
    Ok(())
}
