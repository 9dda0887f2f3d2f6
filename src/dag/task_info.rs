// src/dag/task_info.rs

//! Task nodes and per-run task state.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::{BuildConfig, TaskConfig};
use crate::engine::TaskId;
use crate::errors::{BuildError, Result};
use crate::resolve::{ArtifactCoordinate, ResolvedArtifact, ResolvedSet};

/// Id of the built-in clean task.
pub const CLEAN_TASK_ID: &str = "clean";

/// What executing a node does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// Invoke a registered toolchain.
    Toolchain {
        toolchain: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        target: Option<String>,
        profile: Option<String>,
    },
    /// Delete recorded and declared outputs and reset all fingerprints.
    Clean {
        /// Declared outputs of every other task in the graph.
        outputs: Vec<PathBuf>,
    },
}

/// One node of the task graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub id: TaskId,
    /// Root-relative, normalized input paths (files or directories).
    pub inputs: Vec<PathBuf>,
    /// Root-relative, normalized output paths (files or directories).
    pub outputs: Vec<PathBuf>,
    /// Globs excluded when hashing directory inputs.
    pub exclude: Vec<String>,
    /// Explicit ordering on top of the input/output edges.
    pub after: Vec<TaskId>,
    /// Resolved artifacts this task consumes.
    pub uses: Vec<ResolvedArtifact>,
    pub action: TaskAction,
}

impl TaskNode {
    /// A toolchain task with no inputs, outputs or arguments yet.
    pub fn new(id: impl Into<TaskId>, toolchain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            exclude: Vec::new(),
            after: Vec::new(),
            uses: Vec::new(),
            action: TaskAction::Toolchain {
                toolchain: toolchain.into(),
                args: Vec::new(),
                env: BTreeMap::new(),
                target: None,
                profile: None,
            },
        }
    }

    pub(crate) fn clean(outputs: Vec<PathBuf>) -> Self {
        Self {
            id: CLEAN_TASK_ID.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            exclude: Vec::new(),
            after: Vec::new(),
            uses: Vec::new(),
            action: TaskAction::Clean { outputs },
        }
    }

    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(normalize_path(path.as_ref()));
        self
    }

    pub fn output(mut self, path: impl AsRef<Path>) -> Self {
        self.outputs.push(normalize_path(path.as_ref()));
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    pub fn after(mut self, task: impl Into<TaskId>) -> Self {
        self.after.push(task.into());
        self
    }

    pub fn uses(mut self, artifact: ResolvedArtifact) -> Self {
        self.uses.push(artifact);
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        if let TaskAction::Toolchain { args, .. } = &mut self.action {
            args.push(arg.into());
        }
        self
    }

    /// Build a node from its `[task.<id>]` section.
    ///
    /// Every `uses` entry must be present in `resolved`.
    pub fn from_config(
        id: &str,
        task: &TaskConfig,
        cfg: &BuildConfig,
        resolved: &ResolvedSet,
    ) -> Result<Self> {
        let mut uses = Vec::with_capacity(task.uses.len());
        for reference in &task.uses {
            let dep = cfg.find_dependency(reference).ok_or_else(|| {
                BuildError::Config(format!(
                    "task '{id}' uses unknown dependency '{reference}'"
                ))
            })?;
            let artifact = resolved.get(&dep.name, &dep.version).ok_or_else(|| {
                BuildError::Config(format!(
                    "task '{id}' uses {} which was not resolved",
                    ArtifactCoordinate::from(dep)
                ))
            })?;
            uses.push(artifact.clone());
        }

        Ok(Self {
            id: id.to_string(),
            inputs: task.inputs.iter().map(|p| normalize_path(Path::new(p))).collect(),
            outputs: task.outputs.iter().map(|p| normalize_path(Path::new(p))).collect(),
            exclude: task.exclude.clone(),
            after: task.after.clone(),
            uses,
            action: TaskAction::Toolchain {
                toolchain: task.toolchain.clone(),
                args: task.args.clone(),
                env: task.env.clone(),
                target: task.target.clone(),
                profile: task.profile.clone(),
            },
        })
    }

    pub fn is_clean(&self) -> bool {
        matches!(self.action, TaskAction::Clean { .. })
    }

    /// Name of the toolchain this node runs on, if any.
    pub fn toolchain(&self) -> Option<&str> {
        match &self.action {
            TaskAction::Toolchain { toolchain, .. } => Some(toolchain),
            TaskAction::Clean { .. } => None,
        }
    }
}

/// Drop `.` components and trailing separators so that `./out/`, `out` and
/// `out/.` compare equal.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on dependencies.
    Pending,
    /// Released to the orchestrator (queued for a worker slot or running).
    Running,
    /// Succeeded or was skipped as up to date.
    DoneSuccess,
    /// Failed, or was blocked by a failed dependency.
    DoneFailed,
    /// Never started because the build was halted.
    Cancelled,
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
    Cancelled,
}

impl From<RunState> for TaskRunState {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Pending => TaskRunState::Pending,
            RunState::Running => TaskRunState::Running,
            RunState::DoneSuccess => TaskRunState::DoneSuccess,
            RunState::DoneFailed => TaskRunState::DoneFailed,
            RunState::Cancelled => TaskRunState::Cancelled,
        }
    }
}

/// Scheduler bookkeeping for one node.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub node: Arc<TaskNode>,
    /// Direct dependencies (producers of inputs plus `after`).
    pub deps: Vec<TaskId>,
    pub run_state: RunState,
}

impl TaskInfo {
    pub fn new(node: Arc<TaskNode>, deps: Vec<TaskId>) -> Self {
        Self {
            node,
            deps,
            run_state: RunState::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }
}
