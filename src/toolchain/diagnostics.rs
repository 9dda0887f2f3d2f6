// src/toolchain/diagnostics.rs

//! Recognise error lines in raw tool output.
//!
//! The full output is always kept verbatim; highlights only point at the
//! lines a user most likely wants to read first.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::types::Capability;

// `error: ...`, `error[E0425]: ...`, `src/lib.rs:3:5: error: ...`
static COMPILE_ERROR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?:^|:\s*)error(?:\[[A-Za-z0-9]+\])?:").ok());

// Gradle-style failure banners plus plain `error:` lines.
static PACKAGE_ERROR: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:FAILURE:|\* What went wrong|BUILD FAILED|(?:.*:\s*)?error:)").ok()
});

/// Picks highlight lines out of tool output.
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    builtin: Option<Regex>,
    extra: Option<Regex>,
}

impl Highlighter {
    pub fn for_capability(capability: Capability) -> Self {
        let builtin = match capability {
            Capability::Compile => COMPILE_ERROR.clone(),
            Capability::Package => PACKAGE_ERROR.clone(),
        };
        Self {
            builtin,
            extra: None,
        }
    }

    /// Also highlight lines matching a user-supplied pattern.
    ///
    /// An invalid pattern is logged and ignored.
    pub fn with_pattern(mut self, tool: &str, pattern: Option<&str>) -> Self {
        self.extra = pattern.and_then(|p| match Regex::new(p) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(
                    toolchain = %tool,
                    pattern = %p,
                    error = %e,
                    "invalid error_pattern regex; ignoring"
                );
                None
            }
        });
        self
    }

    /// Matching lines, trimmed, in output order.
    pub fn highlights(&self, output: &str) -> Vec<String> {
        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| {
                self.builtin.as_ref().is_some_and(|r| r.is_match(line))
                    || self.extra.as_ref().is_some_and(|r| r.is_match(line))
            })
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiler_errors_are_highlighted() {
        let output = "\
   Compiling native v0.1.0
error[E0425]: cannot find value `x` in this scope
 --> src/lib.rs:3:5
warning: unused import
error: could not compile `native`
";
        let lines = Highlighter::for_capability(Capability::Compile).highlights(output);
        assert_eq!(
            lines,
            vec![
                "error[E0425]: cannot find value `x` in this scope",
                "error: could not compile `native`",
            ]
        );
    }

    #[test]
    fn packager_failures_are_highlighted() {
        let output = "\
> Task :app:mergeDebugNativeLibs
FAILURE: Build failed with an exception.

* What went wrong:
Execution failed for task ':app:mergeDebugNativeLibs'.
BUILD FAILED in 3s
";
        let lines = Highlighter::for_capability(Capability::Package).highlights(output);
        assert_eq!(
            lines,
            vec![
                "FAILURE: Build failed with an exception.",
                "* What went wrong:",
                "BUILD FAILED in 3s",
            ]
        );
    }

    #[test]
    fn extra_pattern_adds_lines_and_invalid_pattern_is_ignored() {
        let output = "ld: undefined symbol foo\nok\n";
        let hl = Highlighter::for_capability(Capability::Compile)
            .with_pattern("cc", Some("undefined symbol"));
        assert_eq!(hl.highlights(output), vec!["ld: undefined symbol foo"]);

        let hl = Highlighter::for_capability(Capability::Compile).with_pattern("cc", Some("("));
        assert!(hl.highlights(output).is_empty());
    }
}
