// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::task_info::{RunState, TaskInfo, TaskNode};
use crate::dag::TaskGraph;
use crate::engine::TaskId;

/// A task that will not run because something upstream failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedTask {
    pub task: TaskId,
    /// The failed task that blocked it.
    pub dependency: TaskId,
}

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a TaskGraph,
    tasks: &'a mut HashMap<TaskId, TaskInfo>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a TaskGraph, tasks: &'a mut HashMap<TaskId, TaskInfo>) -> Self {
        Self { graph, tasks }
    }

    /// Whether every dependency of `info` succeeded in this run.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        deps_satisfied(self.tasks, info)
    }

    /// Mark every pending or released dependent (transitively) of a failed
    /// task as `DoneFailed`.
    ///
    /// Returns the newly blocked tasks, excluding `failed_task` itself.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<BlockedTask> {
        let mut stack: Vec<(TaskId, TaskId)> = self
            .graph
            .dependents_of(failed_task)
            .iter()
            .map(|d| (d.clone(), failed_task.to_string()))
            .collect();

        let mut blocked = Vec::new();

        while let Some((name, cause)) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                warn!(task = %name, "node in graph not present in tasks map");
                continue;
            };
            match info.run_state {
                RunState::Pending => {
                    info.run_state = RunState::DoneFailed;
                    debug!(
                        task = %name,
                        dependency = %cause,
                        "marking dependent as DoneFailed due to upstream failure"
                    );
                    stack.extend(
                        self.graph
                            .dependents_of(&name)
                            .iter()
                            .map(|d| (d.clone(), cause.clone())),
                    );
                    blocked.push(BlockedTask {
                        task: name,
                        dependency: cause,
                    });
                }
                // Running dependents cannot exist: they would need this task
                // to have succeeded first.
                RunState::Running
                | RunState::DoneSuccess
                | RunState::DoneFailed
                | RunState::Cancelled => {}
            }
        }

        blocked.sort_by(|a, b| a.task.cmp(&b.task));
        blocked
    }

    /// Collect `Pending` tasks whose dependencies all succeeded, mark them as
    /// `Running`, and return them in topological order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<Arc<TaskNode>> {
        // Decide first, then mutate to avoid borrowing issues.
        let candidates: Vec<TaskId> = self
            .graph
            .tasks()
            .filter(|id| {
                self.tasks.get(*id).is_some_and(|info| {
                    info.run_state == RunState::Pending && self.deps_satisfied_for_info(info)
                })
            })
            .map(|id| id.to_string())
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                info!(task = %name, "dependencies satisfied; task is ready");
                info.run_state = RunState::Running;
                ready.push(Arc::clone(&info.node));
            }
        }
        ready
    }

    /// Move every `Pending` task to `Cancelled`; returns their ids.
    pub fn cancel_pending(&mut self) -> Vec<TaskId> {
        let mut cancelled: Vec<TaskId> = self
            .tasks
            .values_mut()
            .filter(|info| info.run_state == RunState::Pending)
            .map(|info| {
                info.run_state = RunState::Cancelled;
                info.node.id.clone()
            })
            .collect();
        cancelled.sort();
        cancelled
    }
}

/// Canonical dependency check shared by the mutable and read-only paths.
pub(crate) fn deps_satisfied(tasks: &HashMap<TaskId, TaskInfo>, info: &TaskInfo) -> bool {
    info.deps.iter().all(|dep_name| match tasks.get(dep_name) {
        Some(dep) => dep.run_state == RunState::DoneSuccess,
        None => {
            warn!(
                task = %info.id(),
                dep = %dep_name,
                "dependency missing from tasks map"
            );
            false
        }
    })
}
