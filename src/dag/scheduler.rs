// src/dag/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{deps_satisfied, StateManager};
use crate::dag::task_info::{RunState, TaskInfo, TaskNode, TaskRunState};
use crate::engine::TaskId;

/// Outcome of a task as far as scheduling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Executed successfully or skipped as up to date.
    Success,
    Failed,
}

/// Scheduler holds the immutable graph plus the state of one build run.
///
/// It is responsible for:
/// - releasing tasks whose dependencies all succeeded
/// - marking tasks as succeeded/failed
/// - failing dependents when a task fails
/// - cancelling tasks that never started when the build halts
#[derive(Debug)]
pub struct Scheduler {
    graph: TaskGraph,
    tasks: HashMap<TaskId, TaskInfo>,
    started: bool,
}

impl Scheduler {
    pub fn new(graph: TaskGraph) -> Self {
        let tasks = graph
            .tasks()
            .filter_map(|id| {
                let node = graph.node(id)?;
                let deps = graph.dependencies_of(id).to_vec();
                Some((id.to_string(), TaskInfo::new(Arc::clone(node), deps)))
            })
            .collect();

        Self {
            graph,
            tasks,
            started: false,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Returns `true` when no task is pending or running.
    pub fn is_idle(&self) -> bool {
        !self
            .tasks
            .values()
            .any(|info| matches!(info.run_state, RunState::Pending | RunState::Running))
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.tasks.get(task).map(|info| info.run_state.into())
    }

    /// Whether every dependency of `task` succeeded in this run.
    ///
    /// Returns `None` if the task is unknown.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(deps_satisfied(&self.tasks, info))
    }

    /// Task ids in topological order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Release the roots of the graph. Calling it twice is a no-op.
    pub fn start(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;
        debug!(tasks = self.tasks.len(), "scheduler: starting build run");

        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        let newly_scheduled = manager.collect_new_ready_tasks();
        SchedulerStep {
            newly_scheduled,
            newly_blocked: Vec::new(),
            run_just_finished: self.is_idle(),
        }
    }

    /// Handle completion of a released task.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };
        if info.run_state != RunState::Running {
            warn!(
                task = %task,
                state = ?info.run_state,
                "completion for task that is not running; ignoring"
            );
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.run_state = RunState::DoneSuccess;
                debug!(task = %task, "task completed successfully");
                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                step.newly_scheduled = manager.collect_new_ready_tasks();
            }
            TaskOutcome::Failed => {
                info.run_state = RunState::DoneFailed;
                warn!(task = %task, "task failed; failing its dependents");
                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                step.newly_blocked = manager.mark_dependents_failed(task);
            }
        }

        step.run_just_finished = self.is_idle();
        if step.run_just_finished {
            info!("scheduler: all tasks terminal; build run finished");
        }
        step
    }

    /// Stop releasing work: every pending task becomes `Cancelled`.
    ///
    /// Tasks already released keep running and still report completion.
    pub fn halt(&mut self) -> Vec<TaskId> {
        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        let cancelled = manager.cancel_pending();
        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "scheduler halted; cancelled pending tasks");
        }
        cancelled
    }

    /// Put a released-but-never-started task back into `Cancelled`.
    pub fn cancel_released(&mut self, task: &str) {
        if let Some(info) = self.tasks.get_mut(task) {
            if info.run_state == RunState::Running {
                info.run_state = RunState::Cancelled;
            }
        }
    }

    /// Node of a task, for diagnostics.
    pub fn node(&self, task: &str) -> Option<&Arc<TaskNode>> {
        self.graph.node(task)
    }
}
