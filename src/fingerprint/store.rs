// src/fingerprint/store.rs

//! Persisted task fingerprints.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::engine::TaskId;
use crate::errors::Result;
use crate::sync::{guard, KeyedLocks};
use crate::types::FingerprintStorage;

/// File name of the store inside the state directory.
pub const FINGERPRINT_FILE: &str = "fingerprints.toml";

/// What was recorded after a task last succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub fingerprint: String,
    /// Root-relative outputs the task declared when it ran.
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    task: BTreeMap<TaskId, FingerprintEntry>,
}

/// Task id → last successful fingerprint, shared by all workers.
///
/// Reads and writes for one task are serialized by a per-task lock; other
/// tasks proceed independently. In file mode every write is persisted.
#[derive(Debug)]
pub struct FingerprintStore {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<TaskId, FingerprintEntry>>,
    locks: KeyedLocks<TaskId>,
    persist_lock: Mutex<()>,
}

impl FingerprintStore {
    /// Store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
            locks: KeyedLocks::new(),
            persist_lock: Mutex::new(()),
        }
    }

    /// Open (or create on first write) the store file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let file: StoreFile = toml::from_str(&contents)?;
            debug!(path = ?path, tasks = file.task.len(), "loaded fingerprint store");
            file.task
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
            locks: KeyedLocks::new(),
            persist_lock: Mutex::new(()),
        })
    }

    /// The store described by `[config]`.
    pub fn from_config(cfg: &BuildConfig) -> Result<Self> {
        match cfg.config.fingerprint_storage {
            FingerprintStorage::File => Self::open(cfg.state_dir().join(FINGERPRINT_FILE)),
            FingerprintStorage::Memory => Ok(Self::in_memory()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, task: &str) -> Option<FingerprintEntry> {
        let key = task.to_string();
        let lock = self.locks.lock_for(&key);
        let _guard = guard(&lock);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task)
            .cloned()
    }

    /// Record the fingerprint of a successful execution.
    pub fn record(&self, task: &str, fingerprint: &str, outputs: &[PathBuf]) -> Result<()> {
        let key = task.to_string();
        let lock = self.locks.lock_for(&key);
        let _guard = guard(&lock);

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key,
                FingerprintEntry {
                    fingerprint: fingerprint.to_string(),
                    outputs: outputs.to_vec(),
                },
            );
        self.persist()?;
        debug!(task = %task, fingerprint = %fingerprint, "recorded fingerprint");
        Ok(())
    }

    /// Every output recorded by any task, sorted and deduplicated.
    pub fn recorded_outputs(&self) -> Vec<PathBuf> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut outputs: Vec<PathBuf> = entries
            .values()
            .flat_map(|e| e.outputs.iter().cloned())
            .collect();
        outputs.sort();
        outputs.dedup();
        outputs
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every fingerprint (and remove the store file).
    pub fn reset(&self) -> Result<()> {
        let _persist = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let n = entries.len();
            entries.clear();
            n
        };
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        info!(removed, "reset fingerprint store");
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let _persist = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = StoreFile {
            task: self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, toml::to_string_pretty(&snapshot)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
