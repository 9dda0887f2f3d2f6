// src/engine/orchestrator.rs

//! Production wiring: core runtime + real executor + Ctrl-C handling.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::dag::{Scheduler, TaskGraph};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::exec::{ExecContext, RealExecutorBackend};
use crate::fingerprint::FingerprintStore;
use crate::report::BuildReport;
use crate::toolchain::ToolchainRegistry;

/// Executes task graphs.
///
/// One orchestrator can run several graphs in sequence; they share the
/// fingerprint store, so a second run of an unchanged graph skips every task
/// that has inputs.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    root: PathBuf,
    toolchains: ToolchainRegistry,
    fingerprints: Arc<FingerprintStore>,
    options: RuntimeOptions,
    handle_ctrl_c: bool,
}

impl Orchestrator {
    pub fn new(
        root: impl Into<PathBuf>,
        toolchains: ToolchainRegistry,
        fingerprints: Arc<FingerprintStore>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            root: root.into(),
            toolchains,
            fingerprints,
            options,
            handle_ctrl_c: false,
        }
    }

    /// Orchestrator for a loaded config: its toolchains, its fingerprint
    /// store, and `[config]` options unless overridden by `options`.
    pub fn from_config(cfg: &BuildConfig, options: RuntimeOptions) -> Result<Self> {
        let fingerprints = Arc::new(FingerprintStore::from_config(cfg)?);
        Ok(Self::new(
            cfg.root(),
            ToolchainRegistry::from_config(cfg),
            fingerprints,
            options,
        ))
    }

    /// Turn Ctrl-C into a graceful stop: nothing new is dispatched and the
    /// report holds what finished.
    pub fn with_ctrl_c(mut self, enabled: bool) -> Self {
        self.handle_ctrl_c = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> RuntimeOptions {
        self.options
    }

    pub fn fingerprints(&self) -> &Arc<FingerprintStore> {
        &self.fingerprints
    }

    pub fn toolchains(&self) -> &ToolchainRegistry {
        &self.toolchains
    }

    /// Execute `graph` leaves-first and return the report.
    pub async fn run(&self, graph: TaskGraph) -> Result<BuildReport> {
        info!(
            tasks = graph.len(),
            jobs = self.options.jobs,
            fail_fast = self.options.fail_fast,
            "starting build"
        );

        // Runtime event channel.
        let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

        let ctx = Arc::new(ExecContext {
            root: self.root.clone(),
            toolchains: self.toolchains.clone(),
            fingerprints: Arc::clone(&self.fingerprints),
        });
        let executor = RealExecutorBackend::new(rt_tx.clone(), ctx);

        // Ctrl-C -> graceful shutdown.
        let ctrl_c = self.handle_ctrl_c.then(|| {
            let tx = rt_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            })
        });
        drop(rt_tx);

        let core = CoreRuntime::new(Scheduler::new(graph), self.options);
        let report = Runtime::new(core, rt_rx, executor).run().await;

        if let Some(handle) = ctrl_c {
            handle.abort();
        }
        report
    }
}
