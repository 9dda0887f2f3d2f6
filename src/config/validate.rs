// src/config/validate.rs

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::Glob;

use crate::config::model::{BuildConfig, RawConfigFile};
use crate::dag::CLEAN_TASK_ID;
use crate::errors::{BuildError, Result};

impl TryFrom<RawConfigFile> for BuildConfig {
    type Error = BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(BuildConfig::new_unchecked(raw, PathBuf::from(".")))
    }
}

/// Run every config-level check on a raw config.
pub fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_repositories(cfg)?;
    validate_dependencies(cfg)?;
    validate_toolchains(cfg)?;
    validate_tasks(cfg)?;
    Ok(())
}

fn config_err(msg: impl Into<String>) -> BuildError {
    BuildError::Config(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_err(
            "config must contain at least one [task.<id>] section",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.jobs == Some(0) {
        return Err(config_err("[config].jobs must be >= 1 (got 0)"));
    }
    if cfg.config.state_dir.as_os_str().is_empty() {
        return Err(config_err("[config].state_dir must not be empty"));
    }
    Ok(())
}

fn validate_repositories(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for repo in &cfg.repository {
        if repo.name.trim().is_empty() {
            return Err(config_err("repository name must not be empty"));
        }
        if !seen.insert(repo.name.as_str()) {
            return Err(config_err(format!(
                "repository '{}' is declared more than once",
                repo.name
            )));
        }
    }
    Ok(())
}

fn validate_dependencies(cfg: &RawConfigFile) -> Result<()> {
    let repos: HashSet<&str> = cfg.repository.iter().map(|r| r.name.as_str()).collect();
    let mut seen = HashSet::new();

    for dep in &cfg.dependency {
        if dep.name.trim().is_empty() || dep.version.trim().is_empty() {
            return Err(config_err(format!(
                "dependency '{}@{}' must have a non-empty name and version",
                dep.name, dep.version
            )));
        }
        if dep.name.contains('@') {
            return Err(config_err(format!(
                "dependency name '{}' must not contain '@'",
                dep.name
            )));
        }
        if !seen.insert((dep.name.as_str(), dep.version.as_str())) {
            return Err(config_err(format!(
                "dependency '{}@{}' is declared more than once",
                dep.name, dep.version
            )));
        }
        for repo in &dep.repositories {
            if !repos.contains(repo.as_str()) {
                return Err(config_err(format!(
                    "dependency '{}@{}' refers to unknown repository '{}'",
                    dep.name, dep.version, repo
                )));
            }
        }
    }
    Ok(())
}

fn validate_toolchains(cfg: &RawConfigFile) -> Result<()> {
    for (name, tc) in &cfg.toolchain {
        if tc.program.trim().is_empty() {
            return Err(config_err(format!(
                "toolchain '{name}' must set a non-empty `program`"
            )));
        }
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    // Resolve `uses` against a throwaway BuildConfig so the lookup rules stay
    // in one place.
    let lookup = BuildConfig::new_unchecked(cfg.clone(), PathBuf::from("."));

    for (id, task) in &cfg.task {
        validate_task_id(id)?;

        if !cfg.toolchain.contains_key(&task.toolchain) {
            return Err(config_err(format!(
                "task '{id}' uses unknown toolchain '{}'",
                task.toolchain
            )));
        }

        for dep in &task.after {
            if !cfg.task.contains_key(dep) {
                return Err(config_err(format!(
                    "task '{id}' has unknown dependency '{dep}' in `after`"
                )));
            }
            if dep == id {
                return Err(config_err(format!(
                    "task '{id}' cannot depend on itself in `after`"
                )));
            }
        }

        for reference in &task.uses {
            if lookup.find_dependency(reference).is_none() {
                return Err(config_err(format!(
                    "task '{id}' uses '{reference}', which does not match exactly one [[dependency]]"
                )));
            }
        }

        for output in &task.outputs {
            if output.trim().is_empty() {
                return Err(config_err(format!("task '{id}' declares an empty output")));
            }
            let escapes = Path::new(output)
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                return Err(config_err(format!(
                    "task '{id}' output '{output}' must be a relative path inside the project"
                )));
            }
        }

        for pattern in &task.exclude {
            if let Err(e) = Glob::new(pattern) {
                return Err(config_err(format!(
                    "task '{id}' has invalid exclude pattern '{pattern}': {e}"
                )));
            }
        }
    }
    Ok(())
}

fn validate_task_id(id: &str) -> Result<()> {
    if id == CLEAN_TASK_ID {
        return Err(config_err(format!(
            "task id '{CLEAN_TASK_ID}' is reserved for the built-in clean task"
        )));
    }
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(config_err(format!(
            "invalid task id '{id}' (allowed: letters, digits, '_', '-', '.')"
        )));
    }
    Ok(())
}
