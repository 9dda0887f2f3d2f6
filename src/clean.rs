// src/clean.rs

//! Removal of build outputs.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Delete every path in `outputs` (relative to `root`).
///
/// Directories are removed recursively and missing paths are ignored.
/// Paths that are absolute or climb out of `root` are never touched.
/// Returns the paths actually removed, sorted.
pub fn remove_outputs(root: &Path, outputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut outputs: Vec<&PathBuf> = outputs.iter().collect();
    outputs.sort();
    outputs.dedup();

    let mut removed = Vec::new();
    for output in outputs {
        if !stays_inside_root(output) {
            warn!(path = ?output, "refusing to remove output outside the project root");
            continue;
        }

        let path = root.join(output);
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?path, "output already absent");
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("inspecting {}", path.display()));
            }
        };

        if meta.is_dir() {
            fs::remove_dir_all(&path).with_context(|| format!("removing {}", path.display()))?;
        } else {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        removed.push(output.clone());
    }

    info!(count = removed.len(), "removed build outputs");
    Ok(removed)
}

fn stays_inside_root(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
