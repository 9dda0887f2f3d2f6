// src/resolve/mod.rs

//! Dependency resolution.
//!
//! - [`coordinate`] defines what is declared (`ArtifactCoordinate`) and what
//!   resolution produces (`ResolvedArtifact`).
//! - [`repository`] holds the `Repository` trait and its implementations.
//! - [`cache`] is the content-addressed local artifact store.
//! - [`resolver`] walks repositories in priority order, first match wins.
//! - [`lockfile`] records the resolved set next to the config.

pub mod cache;
pub mod coordinate;
pub mod lockfile;
pub mod repository;
pub mod resolver;

pub use cache::ArtifactCache;
pub use coordinate::{ArtifactCoordinate, CoordinateKey, ResolvedArtifact};
pub use lockfile::{update_lockfile, Lockfile, LockedArtifact};
pub use repository::{
    repositories_from_config, DirectoryRepository, FetchedArtifact, MemoryRepository, Repository,
};
pub use resolver::{ResolvedSet, Resolver};

use crate::config::BuildConfig;

/// Coordinates declared in `[[dependency]]`, in declaration order.
pub fn coordinates_from_config(cfg: &BuildConfig) -> Vec<ArtifactCoordinate> {
    cfg.dependency.iter().map(ArtifactCoordinate::from).collect()
}
