// src/resolve/repository.rs

//! Artifact repositories the resolver can query.
//!
//! - [`DirectoryRepository`] reads a Maven-like directory tree on disk.
//! - [`MemoryRepository`] keeps artifacts in process; useful for tests and
//!   for embedding buildweave in other tools.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::config::BuildConfig;
use crate::resolve::coordinate::{ArtifactCoordinate, CoordinateKey};

/// Where the bytes of one artifact file come from.
#[derive(Debug, Clone)]
pub enum EntrySource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// One file of a fetched artifact.
#[derive(Debug, Clone)]
pub struct ArtifactEntry {
    /// Path relative to the artifact root.
    pub relative: PathBuf,
    pub source: EntrySource,
}

/// The files a repository returned for a coordinate.
#[derive(Debug, Clone, Default)]
pub struct FetchedArtifact {
    pub entries: Vec<ArtifactEntry>,
}

/// A source of artifacts.
///
/// `fetch` returns:
/// - `Ok(Some(_))` when the repository holds the coordinate,
/// - `Ok(None)` when it is reachable but does not,
/// - `Err(_)` when it cannot be queried at all (unreachable).
pub trait Repository: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn fetch(&self, coordinate: &ArtifactCoordinate) -> Result<Option<FetchedArtifact>>;
}

/// Repository backed by a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    name: String,
    root: PathBuf,
}

impl DirectoryRepository {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Repository for DirectoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, coordinate: &ArtifactCoordinate) -> Result<Option<FetchedArtifact>> {
        if !self.root.is_dir() {
            bail!("repository root {:?} is not a directory", self.root);
        }

        let dir = self.root.join(coordinate.repository_path());
        if !dir.is_dir() {
            debug!(repository = %self.name, coordinate = %coordinate, ?dir, "not present");
            return Ok(None);
        }

        let mut files = Vec::new();
        collect_files(&dir, &dir, &mut files)?;
        if files.is_empty() {
            debug!(repository = %self.name, coordinate = %coordinate, "version directory is empty");
            return Ok(None);
        }
        files.sort();

        let entries = files
            .into_iter()
            .map(|relative| ArtifactEntry {
                source: EntrySource::File(dir.join(&relative)),
                relative,
            })
            .collect();

        Ok(Some(FetchedArtifact { entries }))
    }
}

/// Recursively collect regular files under `dir`, relative to `base`.
fn collect_files(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(base, &path, out)?;
        } else if path.is_file() {
            let relative = path
                .strip_prefix(base)
                .with_context(|| format!("{:?} is not under {:?}", path, base))?;
            out.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// In-process repository.
///
/// Can be switched to "unreachable" to simulate an outage, and counts how
/// often it was queried.
#[derive(Debug)]
pub struct MemoryRepository {
    name: String,
    artifacts: Mutex<HashMap<CoordinateKey, BTreeMap<PathBuf, Vec<u8>>>>,
    reachable: AtomicBool,
    fetches: AtomicUsize,
}

impl MemoryRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artifacts: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Add (or replace) one file of an artifact.
    pub fn insert(
        &self,
        name: &str,
        version: &str,
        relative: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) {
        let mut artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
        artifacts
            .entry((name.to_string(), version.to_string()))
            .or_default()
            .insert(relative.into(), contents.into());
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of `fetch` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Repository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, coordinate: &ArtifactCoordinate) -> Result<Option<FetchedArtifact>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.reachable.load(Ordering::SeqCst) {
            bail!("repository '{}' is unreachable", self.name);
        }

        let artifacts = self.artifacts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(artifacts.get(&coordinate.key()).map(|files| FetchedArtifact {
            entries: files
                .iter()
                .map(|(relative, bytes)| ArtifactEntry {
                    relative: relative.clone(),
                    source: EntrySource::Bytes(bytes.clone()),
                })
                .collect(),
        }))
    }
}

/// Build the configured repositories, in declared priority order.
pub fn repositories_from_config(cfg: &BuildConfig) -> Vec<Arc<dyn Repository>> {
    cfg.repository
        .iter()
        .map(|r| {
            Arc::new(DirectoryRepository::new(&r.name, cfg.root().join(&r.path)))
                as Arc<dyn Repository>
        })
        .collect()
}
