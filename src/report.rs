// src/report.rs

//! Per-task results and the report of one build.

use std::path::PathBuf;

use crate::engine::TaskId;
use crate::errors::BuildError;

/// Terminal status of a task in one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Succeeded,
    Failed,
    /// Up to date: the action was not invoked.
    SkippedCached,
}

impl BuildStatus {
    pub fn is_success(self) -> bool {
        matches!(self, BuildStatus::Succeeded | BuildStatus::SkippedCached)
    }
}

#[derive(Debug)]
pub struct BuildResult {
    pub task: TaskId,
    pub status: BuildStatus,
    /// Outputs present after the task (declared outputs for succeeded and
    /// skipped tasks, nothing for failed ones).
    pub produced: Vec<PathBuf>,
    pub error: Option<BuildError>,
}

impl BuildResult {
    pub fn succeeded(task: impl Into<TaskId>, produced: Vec<PathBuf>) -> Self {
        Self {
            task: task.into(),
            status: BuildStatus::Succeeded,
            produced,
            error: None,
        }
    }

    pub fn skipped(task: impl Into<TaskId>, produced: Vec<PathBuf>) -> Self {
        Self {
            task: task.into(),
            status: BuildStatus::SkippedCached,
            produced,
            error: None,
        }
    }

    pub fn failed(task: impl Into<TaskId>, error: BuildError) -> Self {
        Self {
            task: task.into(),
            status: BuildStatus::Failed,
            produced: Vec::new(),
            error: Some(error),
        }
    }
}

/// Results of one build, in completion order.
///
/// Tasks that never started because the build halted have no entry.
#[derive(Debug, Default)]
pub struct BuildReport {
    results: Vec<BuildResult>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, result: BuildResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[BuildResult] {
        &self.results
    }

    pub fn get(&self, task: &str) -> Option<&BuildResult> {
        self.results.iter().find(|r| r.task == task)
    }

    pub fn status_of(&self, task: &str) -> Option<BuildStatus> {
        self.get(task).map(|r| r.status)
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status == BuildStatus::Failed)
    }

    /// `true` when every recorded result succeeded or was skipped.
    pub fn succeeded(&self) -> bool {
        !self.has_failures()
    }

    /// Ids of tasks with the given status, in completion order.
    pub fn tasks_with(&self, status: BuildStatus) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.task.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> Vec<BuildResult> {
        self.results
    }
}
