// src/dag/mod.rs

//! Task graph and scheduling.
//!
//! - [`task_info`] defines task nodes and their per-run state.
//! - [`graph`] builds the validated DAG from task declarations.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run, and fails dependents of failed tasks.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::{clean_only_graph, TaskGraph, TaskGraphBuilder};
pub use scheduler::{Scheduler, TaskOutcome};
pub use scheduler_step::SchedulerStep;
pub use state_manager::BlockedTask;
pub use task_info::{normalize_path, TaskAction, TaskNode, TaskRunState, CLEAN_TASK_ID};
