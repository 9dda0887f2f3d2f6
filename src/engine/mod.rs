// src/engine/mod.rs

//! Orchestration engine for buildweave.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the worker-slot accounting (at most `jobs` tasks in flight)
//! - the main runtime event loop that reacts to:
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`], and [`orchestrator`] wires both to the real
//! executor.

use crate::report::BuildResult;

/// Canonical task id type used throughout the engine.
pub type TaskId = String;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Stop dispatching new tasks after the first failure.
    pub fail_fast: bool,
    /// Maximum number of tasks in flight.
    pub jobs: usize,
}

impl RuntimeOptions {
    /// Options with `jobs` defaulting to the machine's available parallelism.
    pub fn new(fail_fast: bool, jobs: Option<usize>) -> Self {
        let jobs = jobs.unwrap_or_else(default_jobs).max(1);
        Self { fail_fast, jobs }
    }
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self::new(false, None)
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A dispatched task reached a terminal status.
    TaskCompleted { result: BuildResult },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod orchestrator;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use orchestrator::Orchestrator;
pub use runtime::Runtime;
