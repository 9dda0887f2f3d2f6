// src/errors.rs

//! Crate-wide error type and result alias.

use std::fmt;

use thiserror::Error;

use crate::resolve::ArtifactCoordinate;

/// One repository consulted while resolving a coordinate, with the reason it
/// did not provide the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptedRepository {
    pub repository: String,
    pub reason: String,
}

impl fmt::Display for AttemptedRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.repository, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("unresolved dependency {coordinate}; tried: {}", join_display(.attempted))]
    UnresolvedDependency {
        coordinate: ArtifactCoordinate,
        attempted: Vec<AttemptedRepository>,
    },

    #[error("cyclic dependency between tasks: {}", join_names(.cycle, " -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("output '{output}' is declared by more than one task: {}", join_names(.producers, ", "))]
    AmbiguousOutput {
        output: String,
        producers: Vec<String>,
    },

    #[error("toolchain '{tool}' failed for task '{task}' ({}):\n{diagnostics}", exit_label(.exit_code))]
    ToolchainFailure {
        tool: String,
        task: String,
        exit_code: Option<i32>,
        /// Raw stdout + stderr of the external tool, verbatim.
        diagnostics: String,
        /// Lines recognised as errors in `diagnostics`.
        highlights: Vec<String>,
    },

    #[error("task '{task}' not run: dependency '{dependency}' failed")]
    DependencyFailed { task: String, dependency: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BuildError {
    /// The raw diagnostic text of a toolchain failure, if this is one.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            BuildError::ToolchainFailure { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "no repositories".to_string();
    }
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_names(names: &[String], sep: &str) -> String {
    names.join(sep)
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code".to_string(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
