// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending ready tasks to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{info, warn};

use crate::dag::{Scheduler, TaskNode};
use crate::engine::event_handlers::{handle_task_completion, take_dispatchable, CoreCommand, CoreStep};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::report::{BuildReport, BuildStatus};

/// Pure core runtime state.
///
/// This owns:
/// - the DAG scheduler
/// - the queue of released tasks waiting for a worker slot
/// - the report being accumulated
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    options: RuntimeOptions,
    ready: VecDeque<Arc<TaskNode>>,
    in_flight: usize,
    halted: bool,
    report: BuildReport,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            options,
            ready: VecDeque::new(),
            in_flight: 0,
            halted: false,
            report: BuildReport::new(),
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn into_report(self) -> BuildReport {
        self.report
    }

    /// Release the roots of the graph and dispatch the first batch.
    pub fn start(&mut self) -> CoreStep {
        let step = self.scheduler.start();
        self.ready.extend(step.newly_scheduled);
        self.finish_step()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { result } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let failed = result.status == BuildStatus::Failed;
                let task = result.task.clone();

                let halting = self.halted || (failed && self.options.fail_fast);
                let step = handle_task_completion(
                    &mut self.scheduler,
                    &mut self.report,
                    result,
                    !halting,
                );
                if self.halted {
                    for node in &step.newly_scheduled {
                        self.scheduler.cancel_released(&node.id);
                    }
                } else {
                    self.ready.extend(step.newly_scheduled);
                }

                if failed && self.options.fail_fast && !self.halted {
                    info!(task = %task, "fail-fast: halting after first failure");
                    self.halt();
                }
            }
            RuntimeEvent::ShutdownRequested => {
                if !self.halted {
                    info!(in_flight = self.in_flight, "shutdown requested; waiting for running tasks");
                    self.halt();
                }
            }
        }
        self.finish_step()
    }

    /// Stop dispatching: pending and queued tasks are cancelled.
    fn halt(&mut self) {
        self.halted = true;
        self.scheduler.halt();
        for node in self.ready.drain(..) {
            self.scheduler.cancel_released(&node.id);
        }
    }

    fn finish_step(&mut self) -> CoreStep {
        let mut commands = Vec::new();

        if !self.halted {
            let batch = take_dispatchable(&mut self.ready, &mut self.in_flight, self.options.jobs);
            if !batch.is_empty() {
                commands.push(CoreCommand::DispatchTasks(batch));
            }
        }

        let finished = self.in_flight == 0 && self.ready.is_empty();
        if finished {
            if !self.halted && !self.scheduler.is_idle() {
                warn!("no task in flight but the scheduler is not idle; stopping");
            }
            commands.push(CoreCommand::RequestExit);
        }

        CoreStep {
            commands,
            keep_running: !finished,
        }
    }
}
