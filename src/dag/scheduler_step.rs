// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use std::sync::Arc;

use crate::dag::state_manager::BlockedTask;
use crate::dag::task_info::TaskNode;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the DAG and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<Arc<TaskNode>>,
    /// Dependents newly marked failed because of this step's failure.
    pub newly_blocked: Vec<BlockedTask>,
    /// Whether this step caused the run to finish (every task terminal).
    pub run_just_finished: bool,
}
