// src/toolchain/mod.rs

//! Toolchain adapters.
//!
//! A [`Toolchain`] turns a task node into an invocation of an external tool.
//! The orchestrator only ever talks to the trait; the concrete adapter is
//! picked by name from a [`ToolchainRegistry`].
//!
//! - [`process`] runs an external program (`compile` or `package`).
//! - [`translate`] expands a task into program arguments and environment.
//! - [`diagnostics`] picks error lines out of raw tool output.

pub mod diagnostics;
pub mod process;
pub mod translate;

pub use process::ProcessToolchain;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::BuildConfig;
use crate::dag::TaskNode;
use crate::errors::Result;
use crate::report::BuildResult;
use crate::types::Capability;

/// Boxed future returned by toolchain methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Uniform interface over external build tools.
///
/// Implementations must be safe to call from several workers at once; one
/// toolchain usually serves many tasks.
pub trait Toolchain: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn capability(&self) -> Capability;

    /// Stable description of how this toolchain is configured.
    ///
    /// Folded into every task fingerprint, so changing it re-runs the tasks
    /// that use the toolchain.
    fn signature(&self) -> String;

    /// Run the tool for `task`, with relative paths anchored at `root`.
    ///
    /// A failing tool is reported as `BuildError::ToolchainFailure` carrying
    /// the tool's diagnostics verbatim.
    fn execute<'a>(&'a self, root: &'a Path, task: &'a TaskNode) -> BoxFuture<'a, Result<()>>;

    /// [`Toolchain::execute`] wrapped into a [`BuildResult`].
    fn invoke<'a>(&'a self, root: &'a Path, task: &'a TaskNode) -> BoxFuture<'a, BuildResult> {
        Box::pin(async move {
            match self.execute(root, task).await {
                Ok(()) => BuildResult::succeeded(task.id.clone(), task.outputs.clone()),
                Err(err) => BuildResult::failed(task.id.clone(), err),
            }
        })
    }
}

/// Toolchains by name.
#[derive(Debug, Clone, Default)]
pub struct ToolchainRegistry {
    toolchains: BTreeMap<String, Arc<dyn Toolchain>>,
}

impl ToolchainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`ProcessToolchain`] per `[toolchain.<name>]` section.
    pub fn from_config(cfg: &BuildConfig) -> Self {
        let mut registry = Self::new();
        for (name, toolchain) in &cfg.toolchain {
            registry.register(Arc::new(ProcessToolchain::from_config(name, toolchain)));
        }
        registry
    }

    /// Add a toolchain under its own name, replacing any previous one.
    pub fn register(&mut self, toolchain: Arc<dyn Toolchain>) -> &mut Self {
        self.toolchains
            .insert(toolchain.name().to_string(), toolchain);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Toolchain>> {
        self.toolchains.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.toolchains.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.toolchains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toolchains.is_empty()
    }
}
