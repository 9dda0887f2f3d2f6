// src/fingerprint/mod.rs

//! Staleness detection.
//!
//! - [`hash`] hashes files and expands declared inputs.
//! - [`store`] persists the last successful fingerprint per task.

pub mod hash;
pub mod store;

pub use hash::{build_globset, collect_input_files, compute_file_hash};
pub use store::{FingerprintEntry, FingerprintStore, FINGERPRINT_FILE};

use std::path::Path;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::dag::{TaskAction, TaskNode};

/// Compute the fingerprint of `node` as it would run now.
///
/// Covers the task definition (toolchain `signature`, args, env, target,
/// profile), the contents of every input file, and the content hash of every
/// artifact the task uses. Two calls give the same value exactly when none
/// of those changed.
pub fn compute_task_fingerprint(root: &Path, node: &TaskNode, signature: &str) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut field = |name: &str, value: &str| {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
        hasher.update(value.as_bytes());
        hasher.update(&[0]);
    };

    field("task", &node.id);
    field("toolchain", signature);

    if let TaskAction::Toolchain {
        args,
        env,
        target,
        profile,
        ..
    } = &node.action
    {
        for arg in args {
            field("arg", arg);
        }
        for (k, v) in env {
            field("env", &format!("{k}={v}"));
        }
        field("target", target.as_deref().unwrap_or(""));
        field("profile", profile.as_deref().unwrap_or(""));
    }

    for output in &node.outputs {
        field("output", &output.to_string_lossy());
    }

    let exclude = build_globset(&node.exclude)?;
    for file in collect_input_files(root, &node.inputs, &exclude)? {
        let file_hash = compute_file_hash(&root.join(&file))?;
        field("input", &file.to_string_lossy());
        field("content", &file_hash);
    }

    for artifact in &node.uses {
        field("artifact", &artifact.coordinate.to_string());
        field("artifact-hash", &artifact.content_hash);
    }

    let fingerprint = hasher.finalize().to_hex().to_string();
    debug!(task = %node.id, fingerprint = %fingerprint, "computed task fingerprint");
    Ok(fingerprint)
}
