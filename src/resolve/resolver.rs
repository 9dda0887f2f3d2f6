// src/resolve/resolver.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::errors::{AttemptedRepository, BuildError, Result};
use crate::resolve::cache::ArtifactCache;
use crate::resolve::coordinate::{ArtifactCoordinate, CoordinateKey, ResolvedArtifact};
use crate::resolve::repository::Repository;
use crate::sync::{guard, KeyedLocks};

/// Resolved coordinates of one build, keyed by `(name, version)`.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    artifacts: BTreeMap<CoordinateKey, ResolvedArtifact>,
}

impl ResolvedSet {
    pub fn get(&self, name: &str, version: &str) -> Option<&ResolvedArtifact> {
        self.artifacts.get(&(name.to_string(), version.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedArtifact> {
        self.artifacts.values()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    fn insert(&mut self, artifact: ResolvedArtifact) {
        self.artifacts.insert(artifact.coordinate.key(), artifact);
    }
}

/// Resolves coordinates against repositories in priority order.
///
/// - The first repository that has the coordinate wins, regardless of what
///   later repositories hold.
/// - An unreachable repository is recorded and skipped.
/// - Successful resolutions are cached for the lifetime of the resolver and
///   are authoritative: later calls never query repositories again for the
///   same `(name, version)`.
#[derive(Debug)]
pub struct Resolver {
    repositories: Vec<Arc<dyn Repository>>,
    cache: ArtifactCache,
    resolved: Mutex<HashMap<CoordinateKey, ResolvedArtifact>>,
    locks: KeyedLocks<CoordinateKey>,
}

impl Resolver {
    pub fn new(repositories: Vec<Arc<dyn Repository>>, cache: ArtifactCache) -> Self {
        Self {
            repositories,
            cache,
            resolved: Mutex::new(HashMap::new()),
            locks: KeyedLocks::new(),
        }
    }

    /// Resolve a single coordinate.
    pub fn resolve(&self, coordinate: &ArtifactCoordinate) -> Result<ResolvedArtifact> {
        let key = coordinate.key();

        // Serialize work on this coordinate only.
        let lock = self.locks.lock_for(&key);
        let _guard = guard(&lock);

        if let Some(hit) = self.cached(&key) {
            debug!(coordinate = %coordinate, "resolution cache hit");
            return Ok(hit);
        }

        let mut attempted = Vec::new();

        for repo in self.candidates(coordinate)? {
            match repo.fetch(coordinate) {
                Ok(Some(fetched)) => {
                    let (content_hash, path) = self.cache.store(&fetched)?;
                    let artifact = ResolvedArtifact {
                        coordinate: coordinate.clone(),
                        repository: repo.name().to_string(),
                        content_hash,
                        path,
                    };
                    info!(
                        coordinate = %coordinate,
                        repository = %repo.name(),
                        hash = %artifact.content_hash,
                        "resolved dependency"
                    );
                    self.resolved
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(key, artifact.clone());
                    return Ok(artifact);
                }
                Ok(None) => {
                    debug!(coordinate = %coordinate, repository = %repo.name(), "not found");
                    attempted.push(AttemptedRepository {
                        repository: repo.name().to_string(),
                        reason: "not found".to_string(),
                    });
                }
                Err(err) => {
                    warn!(
                        coordinate = %coordinate,
                        repository = %repo.name(),
                        error = %format!("{err:#}"),
                        "repository unreachable; trying next"
                    );
                    attempted.push(AttemptedRepository {
                        repository: repo.name().to_string(),
                        reason: format!("unreachable: {err:#}"),
                    });
                }
            }
        }

        Err(BuildError::UnresolvedDependency {
            coordinate: coordinate.clone(),
            attempted,
        })
    }

    /// Resolve every coordinate on the calling thread, in order.
    pub fn resolve_all_blocking(&self, coordinates: &[ArtifactCoordinate]) -> Result<ResolvedSet> {
        let mut set = ResolvedSet::default();
        for coordinate in coordinates {
            set.insert(self.resolve(coordinate)?);
        }
        Ok(set)
    }

    /// Resolve every coordinate concurrently on Tokio's blocking pool.
    ///
    /// When several coordinates fail, the error for the one declared first is
    /// returned.
    pub async fn resolve_all(
        self: &Arc<Self>,
        coordinates: &[ArtifactCoordinate],
    ) -> Result<ResolvedSet> {
        let handles: Vec<_> = coordinates
            .iter()
            .cloned()
            .map(|coordinate| {
                let resolver = Arc::clone(self);
                tokio::task::spawn_blocking(move || resolver.resolve(&coordinate))
            })
            .collect();

        let mut set = ResolvedSet::default();
        for handle in handles {
            let artifact = handle.await.map_err(anyhow::Error::from)??;
            set.insert(artifact);
        }
        Ok(set)
    }

    fn cached(&self, key: &CoordinateKey) -> Option<ResolvedArtifact> {
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Repositories to query for `coordinate`, in priority order.
    fn candidates(&self, coordinate: &ArtifactCoordinate) -> Result<Vec<&Arc<dyn Repository>>> {
        if coordinate.repositories.is_empty() {
            return Ok(self.repositories.iter().collect());
        }

        coordinate
            .repositories
            .iter()
            .map(|name| {
                self.repositories
                    .iter()
                    .find(|r| r.name() == name)
                    .ok_or_else(|| {
                        BuildError::Config(format!(
                            "dependency {coordinate} refers to unknown repository '{name}'"
                        ))
                    })
            })
            .collect()
    }
}
