#![allow(dead_code)]

pub use buildweave_test_utils::builders;
pub use buildweave_test_utils::fake_toolchain::FakeToolchain;
pub use buildweave_test_utils::{init_tracing, with_timeout};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use buildweave::engine::{Orchestrator, RuntimeOptions};
use buildweave::fingerprint::FingerprintStore;
use buildweave::toolchain::ToolchainRegistry;

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Orchestrator over `root` with `tool` registered and an in-memory store.
pub fn orchestrator(root: &Path, tool: &FakeToolchain, options: RuntimeOptions) -> Orchestrator {
    orchestrator_with_store(root, tool, options, Arc::new(FingerprintStore::in_memory()))
}

pub fn orchestrator_with_store(
    root: &Path,
    tool: &FakeToolchain,
    options: RuntimeOptions,
    store: Arc<FingerprintStore>,
) -> Orchestrator {
    let mut toolchains = ToolchainRegistry::new();
    toolchains.register(Arc::new(tool.clone()));
    Orchestrator::new(root, toolchains, store, options)
}

pub fn options(fail_fast: bool, jobs: usize) -> RuntimeOptions {
    RuntimeOptions { fail_fast, jobs }
}
