// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning work itself.
//! This makes it easy to swap in a fake executor in tests.
//!
//! - `RealExecutorBackend` is the default implementation used by buildweave.
//!   It spawns one Tokio task per dispatched node; the core never dispatches
//!   more nodes than there are worker slots.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were dispatched and directly emits `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::dag::TaskNode;
use crate::engine::RuntimeEvent;
use crate::errors::Result;

use super::task_runner::{run_task, ExecContext};

/// Trait abstracting how dispatched tasks are executed.
///
/// Every dispatched task must eventually produce exactly one
/// `RuntimeEvent::TaskCompleted`.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// The implementation is free to:
    /// - invoke real toolchains (production)
    /// - simulate completion and emit `RuntimeEvent`s (tests)
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Arc<TaskNode>>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: Arc<ExecContext>,
}

impl RealExecutorBackend {
    /// Create a new real executor backend, wiring it to the given runtime
    /// event sender.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, ctx: Arc<ExecContext>) -> Self {
        Self { runtime_tx, ctx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Arc<TaskNode>>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone what the spawned tasks need so nothing borrows `self`.
        let tx = self.runtime_tx.clone();
        let ctx = Arc::clone(&self.ctx);

        Box::pin(async move {
            for node in tasks {
                debug!(task = %node.id, "spawning task runner");
                tokio::spawn(run_task(node, Arc::clone(&ctx), tx.clone()));
            }
            Ok(())
        })
    }
}
