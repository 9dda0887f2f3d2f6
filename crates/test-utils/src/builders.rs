#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use buildweave::config::{
    BuildConfig, ConfigSection, DependencyConfig, RawConfigFile, RepositoryConfig, TaskConfig,
    ToolchainConfig,
};
use buildweave::types::{Capability, FingerprintStorage};

/// Builder for `BuildConfig` to simplify test setup.
pub struct BuildConfigBuilder {
    config: RawConfigFile,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                repository: Vec::new(),
                dependency: Vec::new(),
                toolchain: BTreeMap::new(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, id: &str, task: TaskConfig) -> Self {
        self.config.task.insert(id.to_string(), task);
        self
    }

    pub fn with_toolchain(mut self, name: &str, capability: Capability, program: &str) -> Self {
        self.config.toolchain.insert(
            name.to_string(),
            ToolchainConfig {
                capability,
                program: program.to_string(),
                args: Vec::new(),
                env: BTreeMap::new(),
                cwd: None,
                error_pattern: None,
            },
        );
        self
    }

    pub fn with_repository(mut self, name: &str, path: &str) -> Self {
        self.config.repository.push(RepositoryConfig {
            name: name.to_string(),
            path: path.into(),
        });
        self
    }

    pub fn with_dependency(mut self, name: &str, version: &str) -> Self {
        self.config.dependency.push(DependencyConfig {
            name: name.to_string(),
            version: version.to_string(),
            repositories: Vec::new(),
        });
        self
    }

    pub fn fail_fast(mut self, val: bool) -> Self {
        self.config.config.fail_fast = val;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.config.jobs = Some(jobs);
        self
    }

    pub fn memory_fingerprints(mut self) -> Self {
        self.config.config.fingerprint_storage = FingerprintStorage::Memory;
        self
    }

    /// The raw config, for tests that exercise validation.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> BuildConfig {
        BuildConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// Validated config anchored at `root`.
    pub fn build_at(self, root: &Path) -> BuildConfig {
        self.build().with_root(root)
    }
}

impl Default for BuildConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(toolchain: &str) -> Self {
        Self {
            task: TaskConfig {
                toolchain: toolchain.to_string(),
                inputs: vec![],
                outputs: vec![],
                exclude: vec![],
                after: vec![],
                args: vec![],
                env: BTreeMap::new(),
                uses: vec![],
                target: None,
                profile: None,
            },
        }
    }

    pub fn input(mut self, path: &str) -> Self {
        self.task.inputs.push(path.to_string());
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.task.outputs.push(path.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.task.exclude.push(pattern.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn uses(mut self, dep: &str) -> Self {
        self.task.uses.push(dep.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.task.args.push(arg.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.task.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn target(mut self, triple: &str) -> Self {
        self.task.target = Some(triple.to_string());
        self
    }

    pub fn profile(mut self, profile: &str) -> Self {
        self.task.profile = Some(profile.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
