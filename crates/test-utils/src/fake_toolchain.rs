use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildweave::dag::TaskNode;
use buildweave::errors::{BuildError, Result};
use buildweave::toolchain::{BoxFuture, Toolchain};
use buildweave::types::Capability;

#[derive(Debug, Default)]
struct FakeState {
    invocations: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    without_outputs: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    signature: Mutex<String>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

/// A toolchain that doesn't spawn processes:
/// - records which tasks were invoked, in invocation order
/// - writes every declared output (unless told not to)
/// - fails the tasks it is told to fail
/// - tracks how many invocations overlapped
///
/// Clones share state, so a test can keep one handle and register another.
#[derive(Debug, Clone)]
pub struct FakeToolchain {
    name: String,
    capability: Capability,
    state: Arc<FakeState>,
}

impl FakeToolchain {
    pub fn new(name: &str) -> Self {
        let state = FakeState::default();
        *state.signature.lock().unwrap() = format!("fake:{name}");
        Self {
            name: name.to_string(),
            capability: Capability::Compile,
            state: Arc::new(state),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    /// Sleep this long inside every invocation.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.state.delay.lock().unwrap() = delay;
        self
    }

    pub fn fail_task(&self, task: &str) {
        self.state.failing.lock().unwrap().insert(task.to_string());
    }

    pub fn stop_failing(&self, task: &str) {
        self.state.failing.lock().unwrap().remove(task);
    }

    /// Succeed for `task` without writing its outputs.
    pub fn omit_outputs(&self, task: &str) {
        self.state.without_outputs.lock().unwrap().insert(task.to_string());
    }

    pub fn set_signature(&self, signature: &str) {
        *self.state.signature.lock().unwrap() = signature.to_string();
    }

    pub fn invocations(&self) -> Vec<String> {
        self.state.invocations.lock().unwrap().clone()
    }

    pub fn invocation_count(&self, task: &str) -> usize {
        self.invocations().iter().filter(|t| *t == task).count()
    }

    pub fn clear_invocations(&self) {
        self.state.invocations.lock().unwrap().clear();
    }

    pub fn max_concurrency(&self) -> usize {
        self.state.max_running.load(Ordering::SeqCst)
    }

    async fn run(&self, root: &Path, task: &TaskNode) -> Result<()> {
        self.state.invocations.lock().unwrap().push(task.id.clone());
        let now = self.state.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_running.fetch_max(now, Ordering::SeqCst);

        let delay = *self.state.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = self.finish(root, task);
        self.state.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn finish(&self, root: &Path, task: &TaskNode) -> Result<()> {
        if self.state.failing.lock().unwrap().contains(&task.id) {
            return Err(BuildError::ToolchainFailure {
                tool: self.name.clone(),
                task: task.id.clone(),
                exit_code: Some(1),
                diagnostics: format!("error: {} failed on purpose\n", task.id),
                highlights: vec![format!("error: {} failed on purpose", task.id)],
            });
        }
        if self.state.without_outputs.lock().unwrap().contains(&task.id) {
            return Ok(());
        }
        for output in &task.outputs {
            let path = root.join(output);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, format!("built by {}\n", task.id))?;
        }
        Ok(())
    }
}

impl Toolchain for FakeToolchain {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn signature(&self) -> String {
        self.state.signature.lock().unwrap().clone()
    }

    fn execute<'a>(&'a self, root: &'a Path, task: &'a TaskNode) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.run(root, task))
    }
}
