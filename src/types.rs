use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What an external toolchain is used for.
///
/// - `Compile`: a native/systems-language compiler (e.g. `cargo`).
/// - `Package`: an application packaging tool (e.g. `gradlew`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Compile,
    Package,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Compile => f.write_str("compile"),
            Capability::Package => f.write_str("package"),
        }
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compile" => Ok(Capability::Compile),
            "package" => Ok(Capability::Package),
            other => Err(format!(
                "invalid toolchain capability: {other} (expected \"compile\" or \"package\")"
            )),
        }
    }
}

/// Mode for storing task fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintStorage {
    /// Persist fingerprints in `<state_dir>/fingerprints.toml`.
    File,
    /// Keep fingerprints in memory only (lost when the process exits).
    Memory,
}

impl Default for FingerprintStorage {
    fn default() -> Self {
        FingerprintStorage::File
    }
}
