// src/resolve/cache.rs

//! Content-addressed on-disk store for resolved artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fingerprint::hash::compute_file_hash;
use crate::resolve::repository::{EntrySource, FetchedArtifact};
use crate::sync::{guard, KeyedLocks};

/// Distinguishes staging directories of concurrent stores in one process.
static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Artifacts live in `<dir>/<content hash>/<relative path>`.
///
/// Different coordinates may carry identical content; stores of the same
/// hash are serialized, stores of different hashes run in parallel.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
    locks: Arc<KeyedLocks<String>>,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hash a fetched artifact and materialise it in the cache.
    ///
    /// Returns `(content_hash, path)`. When an entry with the same hash is
    /// already present it is reused as is.
    pub fn store(&self, artifact: &FetchedArtifact) -> Result<(String, PathBuf)> {
        let hash = content_hash(artifact)?;
        let target = self.dir.join(&hash);

        let lock = self.locks.lock_for(&hash);
        let _guard = guard(&lock);

        if target.is_dir() {
            debug!(hash = %hash, "artifact already cached");
            return Ok((hash, target));
        }

        let partial = self.dir.join(format!(
            ".partial-{}-{}-{}",
            hash,
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        if partial.exists() {
            fs::remove_dir_all(&partial)
                .with_context(|| format!("removing stale partial dir {:?}", partial))?;
        }

        for entry in &artifact.entries {
            let dest = partial.join(&entry.relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating cache dir {:?}", parent))?;
            }
            match &entry.source {
                EntrySource::File(src) => {
                    fs::copy(src, &dest)
                        .with_context(|| format!("copying {:?} into cache", src))?;
                }
                EntrySource::Bytes(bytes) => {
                    fs::write(&dest, bytes)
                        .with_context(|| format!("writing {:?} into cache", dest))?;
                }
            }
        }

        if let Err(err) = fs::rename(&partial, &target) {
            // Another process may have stored the same content first.
            if target.is_dir() {
                let _ = fs::remove_dir_all(&partial);
            } else {
                return Err(err).with_context(|| format!("moving artifact into {:?}", target));
            }
        }

        info!(hash = %hash, path = ?target, "stored artifact in cache");
        Ok((hash, target))
    }
}

/// Deterministic hash over the artifact's relative paths and file contents.
pub fn content_hash(artifact: &FetchedArtifact) -> Result<String> {
    let mut entries: Vec<_> = artifact.entries.iter().collect();
    entries.sort_by(|a, b| a.relative.cmp(&b.relative));

    let mut hasher = Hasher::new();
    for entry in entries {
        hasher.update(entry.relative.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        let file_hash = match &entry.source {
            EntrySource::File(path) => compute_file_hash(path)?,
            EntrySource::Bytes(bytes) => blake3::hash(bytes).to_hex().to_string(),
        };
        hasher.update(file_hash.as_bytes());
    }
    Ok(hasher.finalize().to_hex().to_string())
}
