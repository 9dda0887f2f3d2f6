// src/resolve/coordinate.rs

use std::fmt;
use std::path::PathBuf;

use crate::config::DependencyConfig;

/// Identity of a coordinate in caches and lockfiles: `(name, version)`.
pub type CoordinateKey = (String, String);

/// An external dependency as declared in the config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactCoordinate {
    pub name: String,
    pub version: String,
    /// Repository names to query, in priority order. Empty means all
    /// configured repositories in their declared order.
    pub repositories: Vec<String>,
}

impl ArtifactCoordinate {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            repositories: Vec::new(),
        }
    }

    /// Restrict resolution to these repositories, queried in this order.
    pub fn with_repositories<I, S>(mut self, repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repositories = repositories.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(&self) -> CoordinateKey {
        (self.name.clone(), self.version.clone())
    }

    /// Relative directory of this coordinate inside a directory repository.
    ///
    /// `group.id:artifact` maps to `group/id/artifact/<version>`, a plain
    /// `name` maps to `name/<version>`.
    pub fn repository_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        match self.name.split_once(':') {
            Some((group, artifact)) => {
                for part in group.split('.').filter(|p| !p.is_empty()) {
                    path.push(part);
                }
                path.push(artifact);
            }
            None => path.push(&self.name),
        }
        path.push(&self.version);
        path
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl From<&DependencyConfig> for ArtifactCoordinate {
    fn from(dep: &DependencyConfig) -> Self {
        ArtifactCoordinate::new(&dep.name, &dep.version)
            .with_repositories(dep.repositories.iter().cloned())
    }
}

/// A coordinate resolved to a content-addressed copy in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub coordinate: ArtifactCoordinate,
    /// Repository that provided the artifact.
    pub repository: String,
    /// blake3 hash over the artifact's relative file paths and contents.
    pub content_hash: String,
    /// Directory in the artifact cache holding the artifact's files.
    pub path: PathBuf,
}
