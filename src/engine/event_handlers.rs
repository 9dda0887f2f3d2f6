// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::{Scheduler, SchedulerStep, TaskNode, TaskOutcome};
use crate::errors::BuildError;
use crate::report::{BuildReport, BuildResult, BuildStatus};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<Arc<TaskNode>>),
    /// Every dispatched task has reported back; the build is over.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    /// Tasks dispatched by this step, in dispatch order.
    pub fn dispatched(&self) -> impl Iterator<Item = &Arc<TaskNode>> {
        self.commands.iter().flat_map(|c| match c {
            CoreCommand::DispatchTasks(tasks) => tasks.as_slice(),
            CoreCommand::RequestExit => &[],
        })
    }
}

/// Handle a task completion event.
///
/// Records `result` in the report and feeds the outcome to the scheduler.
/// With `record_blocked`, every dependent it blocked is reported as failed
/// with `DependencyFailed`; a halting build leaves them out of the report.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    report: &mut BuildReport,
    result: BuildResult,
    record_blocked: bool,
) -> SchedulerStep {
    let outcome = match result.status {
        BuildStatus::Succeeded | BuildStatus::SkippedCached => TaskOutcome::Success,
        BuildStatus::Failed => TaskOutcome::Failed,
    };
    let task = result.task.clone();
    debug!(task = %task, status = ?result.status, "task completed");
    report.push(result);

    let step = scheduler.handle_completion(&task, outcome);
    if !record_blocked {
        if !step.newly_blocked.is_empty() {
            debug!(
                task = %task,
                blocked = step.newly_blocked.len(),
                "halting; blocked dependents not reported"
            );
        }
        return step;
    }
    for blocked in &step.newly_blocked {
        warn!(
            task = %blocked.task,
            dependency = %blocked.dependency,
            "task blocked by failed dependency"
        );
        report.push(BuildResult::failed(
            blocked.task.clone(),
            BuildError::DependencyFailed {
                task: blocked.task.clone(),
                dependency: blocked.dependency.clone(),
            },
        ));
    }
    step
}

/// Take as many ready tasks as there are free worker slots.
pub fn take_dispatchable(
    ready: &mut VecDeque<Arc<TaskNode>>,
    in_flight: &mut usize,
    jobs: usize,
) -> Vec<Arc<TaskNode>> {
    let free = jobs.saturating_sub(*in_flight);
    let n = free.min(ready.len());
    let batch: Vec<_> = ready.drain(..n).collect();
    *in_flight += batch.len();
    batch
}
