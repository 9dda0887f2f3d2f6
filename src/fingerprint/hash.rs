// src/fingerprint/hash.rs

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use blake3::Hasher;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compile `exclude` patterns into a single matcher.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Expand declared inputs into the set of files they cover.
///
/// - `inputs` are relative to `root`; a file input is taken as is, a
///   directory input is walked recursively.
/// - Files whose root-relative path matches `exclude` are skipped.
/// - A declared input that does not exist is an error.
///
/// Returns root-relative paths, sorted, without duplicates.
pub fn collect_input_files(
    root: &Path,
    inputs: &[PathBuf],
    exclude: &GlobSet,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let abs = root.join(input);
        if abs.is_file() {
            if !exclude.is_match(input) {
                files.push(input.clone());
            }
        } else if abs.is_dir() {
            let mut stack = vec![input.clone()];
            while let Some(rel_dir) = stack.pop() {
                let dir = root.join(&rel_dir);
                for entry in std::fs::read_dir(&dir)
                    .with_context(|| format!("reading input dir {:?}", dir))?
                {
                    let name = entry?.file_name();
                    let rel = rel_dir.join(name);
                    let abs = root.join(&rel);
                    if exclude.is_match(&rel) {
                        continue;
                    }
                    if abs.is_dir() {
                        stack.push(rel);
                    } else if abs.is_file() {
                        files.push(rel);
                    }
                }
            }
        } else {
            bail!("declared input {:?} does not exist", abs);
        }
    }

    files.sort();
    files.dedup();
    debug!(count = files.len(), "collected input files");
    Ok(files)
}
