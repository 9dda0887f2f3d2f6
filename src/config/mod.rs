// src/config/mod.rs

//! Configuration loading and validation for buildweave.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate cross-references and basic sanity (`validate.rs`).
//!
//! Task-graph invariants (cycles, ambiguous outputs) are not checked here;
//! they belong to [`crate::dag::TaskGraphBuilder::build`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    BuildConfig, ConfigSection, DependencyConfig, RawConfigFile, RepositoryConfig, TaskConfig,
    ToolchainConfig,
};
