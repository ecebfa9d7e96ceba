//! Scripted playground run
//!
//! Builds a machine from the app config, drives it through a fixed sequence
//! of actions and then hammers it from several threads, checking that no
//! increment is lost.

use crate::actions::{PlaygroundAction, PlaygroundActionKind};
use crate::reducers::{self, PlaygroundMachine};
use crate::state::PlaygroundState;
use anyhow::{anyhow, bail, Context, Result};
use machine::MachineError;
use machine_config::AppConfig;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Outcome of a playground run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub final_state: PlaygroundState,
    /// Number of commits observed by subscribers
    pub commits: usize,
}

/// Run the scenario, writing every scripted step to `out`.
pub fn run(config: &AppConfig, out: &mut impl Write) -> Result<Report> {
    let machine = PlaygroundMachine::with_options(config.machine);
    machine.initialize(PlaygroundState::from(&config.playground))?;
    reducers::register_all(&machine)?;

    let commits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&commits);
    let _counting = machine.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let _logging = machine.subscribe(|state| {
        log::debug!("State changed: {}", state);
        Ok(())
    });

    writeln!(out, "initial: {}", machine.get_state()?)?;

    let script = [
        PlaygroundAction::Add,
        PlaygroundAction::Add,
        PlaygroundAction::DoubleNested,
        PlaygroundAction::Rename("machine".to_string()),
        PlaygroundAction::Noop,
    ];
    for action in &script {
        let state = machine
            .dispatch(action)
            .with_context(|| format!("Dispatch of {:?} failed", action))?;
        writeln!(out, "{:?}: {}", action, state)?;
    }

    machine.deregister(PlaygroundActionKind::Noop);
    match machine.dispatch(&PlaygroundAction::Noop) {
        Err(MachineError::ActionNotRegistered { kind }) => {
            writeln!(out, "{} deregistered", kind)?;
        }
        other => bail!("Expected Noop to be deregistered, got {:?}", other),
    }

    let before = machine.get_state()?.count;
    let scenario = &config.playground;
    hammer(&machine, scenario.workers, scenario.dispatches_per_worker)?;

    let final_state = machine.get_state()?;
    let expected = before + scenario.total_dispatches() as i64;
    if final_state.count != expected {
        bail!(
            "Lost updates: expected count {}, got {}",
            expected,
            final_state.count
        );
    }
    writeln!(
        out,
        "{} concurrent increments: {}",
        scenario.total_dispatches(),
        final_state
    )?;

    Ok(Report {
        final_state,
        commits: commits.load(Ordering::SeqCst),
    })
}

/// Dispatch `Increment` from `workers` threads, `per_worker` times each.
fn hammer(machine: &PlaygroundMachine, workers: usize, per_worker: usize) -> Result<()> {
    log::info!(
        "Dispatching {} increments from {} workers",
        workers * per_worker,
        workers
    );

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || -> Result<(), MachineError> {
                    for _ in 0..per_worker {
                        machine.dispatch(&PlaygroundAction::Increment)?;
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow!("Worker thread panicked"))??;
        }
        Ok(())
    })
}
