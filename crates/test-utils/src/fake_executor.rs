use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use buildweave::dag::TaskNode;
use buildweave::engine::RuntimeEvent;
use buildweave::errors::{BuildError, Result};
use buildweave::exec::ExecutorBackend;
use buildweave::report::BuildResult;

/// A fake executor that:
/// - records which tasks were dispatched
/// - immediately reports a result for each dispatched task
///   (failed for ids in `failing`, succeeded otherwise).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Arc<TaskNode>>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.id.clone());
                }

                let result = if failing.contains(&t.id) {
                    BuildResult::failed(t.id.clone(), BuildError::Config("fake failure".into()))
                } else {
                    BuildResult::succeeded(t.id.clone(), t.outputs.clone())
                };

                tx.send(RuntimeEvent::TaskCompleted { result })
                    .await
                    .map_err(|e| BuildError::Other(anyhow::anyhow!("runtime channel closed: {e}")))?;
            }
            Ok(())
        })
    }
}
