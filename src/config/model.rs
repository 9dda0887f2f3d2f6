// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{Capability, FingerprintStorage};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// fail_fast = false
/// jobs = 4
///
/// [[repository]]
/// name = "mavenCentral"
/// path = "repos/central"
///
/// [[dependency]]
/// name = "org.libsdl:sdl2"
/// version = "2.0.20"
///
/// [toolchain.rust]
/// capability = "compile"
/// program = "cargo"
/// args = ["build", "--manifest-path", "native/Cargo.toml"]
///
/// [task.native]
/// toolchain = "rust"
/// inputs = ["native/src", "native/Cargo.toml"]
/// outputs = ["native/target/libmain.so"]
/// uses = ["org.libsdl:sdl2@2.0.20"]
/// ```
///
/// Every section except `[task.*]` is optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Repositories in priority order (first match wins).
    #[serde(default)]
    pub repository: Vec<RepositoryConfig>,

    #[serde(default)]
    pub dependency: Vec<DependencyConfig>,

    /// Toolchains keyed by the name tasks refer to.
    #[serde(default)]
    pub toolchain: BTreeMap<String, ToolchainConfig>,

    /// Tasks keyed by task id.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated, immutable build configuration.
///
/// Obtain one through [`crate::config::load_and_validate`] or
/// `BuildConfig::try_from(raw)`; nothing mutates it after loading.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub config: ConfigSection,
    pub repository: Vec<RepositoryConfig>,
    pub dependency: Vec<DependencyConfig>,
    pub toolchain: BTreeMap<String, ToolchainConfig>,
    pub task: BTreeMap<String, TaskConfig>,
    /// Directory relative paths in the config are resolved against.
    root: PathBuf,
}

impl BuildConfig {
    pub(crate) fn new_unchecked(raw: RawConfigFile, root: PathBuf) -> Self {
        Self {
            config: raw.config,
            repository: raw.repository,
            dependency: raw.dependency,
            toolchain: raw.toolchain,
            task: raw.task,
            root,
        }
    }

    /// Project root (the directory containing the config file).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Same config, anchored at a different project root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(&self.config.state_dir)
    }

    /// Local artifact cache, `<state_dir>/artifacts`.
    pub fn artifact_dir(&self) -> PathBuf {
        self.state_dir().join("artifacts")
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(&self.config.lockfile)
    }

    /// Find the dependency a task's `uses` entry refers to.
    ///
    /// Accepts `name@version` or a bare `name` when only one version of that
    /// name is declared.
    pub fn find_dependency(&self, reference: &str) -> Option<&DependencyConfig> {
        match reference.rsplit_once('@') {
            Some((name, version)) => self
                .dependency
                .iter()
                .find(|d| d.name == name && d.version == version),
            None => {
                let mut matches = self.dependency.iter().filter(|d| d.name == reference);
                let first = matches.next()?;
                if matches.next().is_some() {
                    None
                } else {
                    Some(first)
                }
            }
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Stop dispatching new tasks after the first failure.
    #[serde(default)]
    pub fail_fast: bool,

    /// Worker pool size. `None` means the machine's available parallelism.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Where fingerprints and the artifact cache live, relative to the root.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub fingerprint_storage: FingerprintStorage,

    #[serde(default = "default_lockfile")]
    pub lockfile: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".buildweave")
}

fn default_lockfile() -> PathBuf {
    PathBuf::from("Buildweave.lock")
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            fail_fast: false,
            jobs: None,
            state_dir: default_state_dir(),
            fingerprint_storage: FingerprintStorage::default(),
            lockfile: default_lockfile(),
        }
    }
}

/// `[[repository]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    /// Local directory holding artifacts, relative to the project root.
    pub path: PathBuf,
}

/// `[[dependency]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyConfig {
    pub name: String,
    pub version: String,
    /// Repository names to query for this dependency, in order.
    ///
    /// Empty means "all repositories, in declared order".
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// `[toolchain.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainConfig {
    pub capability: Capability,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory relative to the project root.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Extra regex marking error lines in the tool's output.
    #[serde(default)]
    pub error_pattern: Option<String>,
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Name of the `[toolchain.<name>]` that runs this task.
    pub toolchain: String,

    /// Files or directories this task reads (relative to the project root).
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Files or directories this task produces.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Glob patterns excluded when hashing directory inputs.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Explicit ordering: this task runs after all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Extra arguments appended to the toolchain's base arguments.
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Dependencies (`name@version` or `name`) made available to the tool.
    #[serde(default)]
    pub uses: Vec<String>,

    /// Target triple for compile toolchains.
    #[serde(default)]
    pub target: Option<String>,

    /// Build profile for compile toolchains (`"release"` adds `--release`).
    #[serde(default)]
    pub profile: Option<String>,
}
