// src/resolve/lockfile.rs

//! `Buildweave.lock`: the resolved artifact set, written after resolution.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::resolve::resolver::ResolvedSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub artifact: Vec<LockedArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedArtifact {
    pub name: String,
    pub version: String,
    pub repository: String,
    pub hash: String,
}

impl Lockfile {
    pub fn from_resolved(set: &ResolvedSet) -> Self {
        let artifact = set
            .iter()
            .map(|a| LockedArtifact {
                name: a.coordinate.name.clone(),
                version: a.coordinate.version.clone(),
                repository: a.repository.clone(),
                hash: a.content_hash.clone(),
            })
            .collect();
        Self { artifact }
    }

    /// Read a lockfile; a missing file is `Ok(None)`.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&contents)?))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = toml::to_string_pretty(self)?;
        fs::write(path, format!("# Generated by buildweave. Do not edit.\n{body}"))?;
        debug!(path = ?path, entries = self.artifact.len(), "wrote lockfile");
        Ok(())
    }

    /// Coordinates whose hash or repository differs from `previous`.
    pub fn drift_from(&self, previous: &Lockfile) -> Vec<String> {
        self.artifact
            .iter()
            .filter_map(|now| {
                let before = previous
                    .artifact
                    .iter()
                    .find(|b| b.name == now.name && b.version == now.version)?;
                if before.hash != now.hash || before.repository != now.repository {
                    Some(format!(
                        "{}@{}: {} ({}) -> {} ({})",
                        now.name, now.version, before.hash, before.repository, now.hash, now.repository
                    ))
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Write the lockfile for `set`, warning about artifacts that changed since
/// the previous lock.
pub fn update_lockfile(path: &Path, set: &ResolvedSet) -> Result<Lockfile> {
    let lock = Lockfile::from_resolved(set);
    match Lockfile::read(path) {
        Ok(Some(previous)) => {
            for change in lock.drift_from(&previous) {
                warn!(change = %change, "resolved artifact differs from lockfile");
            }
        }
        Ok(None) => {}
        Err(err) => warn!(error = %err, path = ?path, "ignoring unreadable lockfile"),
    }
    lock.write(path)?;
    Ok(lock)
}
