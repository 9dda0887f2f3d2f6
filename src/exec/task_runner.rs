// src/exec/task_runner.rs

//! Execution of a single dispatched task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::clean::remove_outputs;
use crate::dag::{TaskAction, TaskNode};
use crate::engine::RuntimeEvent;
use crate::errors::{BuildError, Result};
use crate::fingerprint::{compute_task_fingerprint, FingerprintStore};
use crate::report::{BuildResult, BuildStatus};
use crate::toolchain::{Toolchain, ToolchainRegistry};

/// Everything a task runner needs besides the node itself.
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Project root; relative task paths are anchored here.
    pub root: PathBuf,
    pub toolchains: ToolchainRegistry,
    pub fingerprints: Arc<FingerprintStore>,
}

/// Run one task and report its result to the runtime.
pub async fn run_task(
    node: Arc<TaskNode>,
    ctx: Arc<ExecContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let result = execute_node(&node, &ctx).await;

    match (&result.status, &result.error) {
        (BuildStatus::Failed, Some(err)) => error!(task = %node.id, error = %err, "task failed"),
        (status, _) => info!(task = %node.id, ?status, "task finished"),
    }

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted { result })
        .await
        .is_err()
    {
        warn!(task = %node.id, "runtime is gone; dropping task result");
    }
}

/// Execute `node` and return its result.
///
/// Toolchain tasks whose fingerprint matches the stored one (and whose
/// outputs all exist) are skipped without invoking the toolchain. Tasks
/// without declared inputs always run.
pub async fn execute_node(node: &Arc<TaskNode>, ctx: &ExecContext) -> BuildResult {
    match &node.action {
        TaskAction::Clean { outputs } => run_clean(node, outputs, ctx).await,
        TaskAction::Toolchain { toolchain, .. } => match ctx.toolchains.get(toolchain) {
            Some(tool) => run_toolchain(node, tool, ctx).await,
            None => BuildResult::failed(
                node.id.clone(),
                BuildError::Config(format!(
                    "task '{}' refers to unknown toolchain '{}'",
                    node.id, toolchain
                )),
            ),
        },
    }
}

async fn run_clean(node: &TaskNode, declared: &[PathBuf], ctx: &ExecContext) -> BuildResult {
    let root = ctx.root.clone();
    let store = Arc::clone(&ctx.fingerprints);
    let mut outputs = declared.to_vec();

    let cleaned = tokio::task::spawn_blocking(move || -> Result<()> {
        outputs.extend(store.recorded_outputs());
        remove_outputs(&root, &outputs)?;
        store.reset()
    })
    .await;

    match cleaned {
        Ok(Ok(())) => BuildResult::succeeded(node.id.clone(), Vec::new()),
        Ok(Err(err)) => BuildResult::failed(node.id.clone(), err),
        Err(join) => BuildResult::failed(
            node.id.clone(),
            anyhow!("clean task panicked: {join}").into(),
        ),
    }
}

async fn run_toolchain(
    node: &Arc<TaskNode>,
    tool: Arc<dyn Toolchain>,
    ctx: &ExecContext,
) -> BuildResult {
    let fingerprint = match fingerprint_of(node, tool.signature(), &ctx.root).await {
        Ok(fp) => fp,
        Err(err) => return BuildResult::failed(node.id.clone(), err),
    };

    if is_up_to_date(node, &fingerprint, ctx) {
        info!(task = %node.id, "up to date; skipping");
        return BuildResult::skipped(node.id.clone(), node.outputs.clone());
    }

    let result = tool.invoke(&ctx.root, node).await;
    if result.status != BuildStatus::Succeeded {
        return result;
    }

    let missing = missing_outputs(&ctx.root, &node.outputs);
    if !missing.is_empty() {
        let listed: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
        return BuildResult::failed(
            node.id.clone(),
            BuildError::ToolchainFailure {
                tool: tool.name().to_string(),
                task: node.id.clone(),
                exit_code: Some(0),
                diagnostics: format!("declared outputs were not produced: {}", listed.join(", ")),
                highlights: listed,
            },
        );
    }

    let store = Arc::clone(&ctx.fingerprints);
    let (task, outputs) = (node.id.clone(), node.outputs.clone());
    let recorded =
        tokio::task::spawn_blocking(move || store.record(&task, &fingerprint, &outputs)).await;
    match recorded {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(task = %node.id, error = %err, "failed to record fingerprint"),
        Err(join) => warn!(task = %node.id, error = %join, "fingerprint recording panicked"),
    }

    result
}

async fn fingerprint_of(node: &Arc<TaskNode>, signature: String, root: &Path) -> Result<String> {
    let node = Arc::clone(node);
    let root = root.to_path_buf();
    let computed =
        tokio::task::spawn_blocking(move || compute_task_fingerprint(&root, &node, &signature))
            .await
            .map_err(|join| anyhow!("fingerprinting panicked: {join}"))?;
    Ok(computed?)
}

fn is_up_to_date(node: &TaskNode, fingerprint: &str, ctx: &ExecContext) -> bool {
    if node.inputs.is_empty() {
        debug!(task = %node.id, "no declared inputs; always runs");
        return false;
    }
    let Some(entry) = ctx.fingerprints.get(&node.id) else {
        debug!(task = %node.id, "no stored fingerprint");
        return false;
    };
    if entry.fingerprint != fingerprint {
        debug!(task = %node.id, "fingerprint changed");
        return false;
    }
    let missing = missing_outputs(&ctx.root, &node.outputs);
    if !missing.is_empty() {
        debug!(task = %node.id, ?missing, "outputs missing; re-running");
        return false;
    }
    true
}

fn missing_outputs(root: &Path, outputs: &[PathBuf]) -> Vec<PathBuf> {
    outputs
        .iter()
        .filter(|p| !root.join(p).exists())
        .cloned()
        .collect()
}
