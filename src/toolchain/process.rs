// src/toolchain/process.rs

//! External-process toolchain.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ToolchainConfig;
use crate::dag::TaskNode;
use crate::errors::{BuildError, Result};
use crate::toolchain::diagnostics::Highlighter;
use crate::toolchain::translate::{self, ToolSettings};
use crate::toolchain::{BoxFuture, Toolchain};
use crate::types::Capability;

/// Runs a configured program once per task.
///
/// The output of the program is untrusted text: it is decoded lossily, logged
/// line by line at `debug`, and returned verbatim on failure.
#[derive(Debug, Clone)]
pub struct ProcessToolchain {
    name: String,
    settings: ToolSettings,
    highlighter: Highlighter,
}

impl ProcessToolchain {
    pub fn new(name: impl Into<String>, capability: Capability, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: ToolSettings {
                capability,
                program: program.into(),
                args: Vec::new(),
                env: Default::default(),
                cwd: None,
            },
            highlighter: Highlighter::for_capability(capability),
        }
    }

    pub fn from_config(name: &str, cfg: &ToolchainConfig) -> Self {
        Self {
            name: name.to_string(),
            settings: ToolSettings {
                capability: cfg.capability,
                program: cfg.program.clone(),
                args: cfg.args.clone(),
                env: cfg.env.clone(),
                cwd: cfg.cwd.clone(),
            },
            highlighter: Highlighter::for_capability(cfg.capability)
                .with_pattern(name, cfg.error_pattern.as_deref()),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.settings.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.settings.cwd = Some(cwd.into());
        self
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    fn failure(&self, task: &TaskNode, exit_code: Option<i32>, diagnostics: String) -> BuildError {
        let highlights = self.highlighter.highlights(&diagnostics);
        BuildError::ToolchainFailure {
            tool: self.name.clone(),
            task: task.id.clone(),
            exit_code,
            diagnostics,
            highlights,
        }
    }

    async fn run(&self, root: &Path, task: &TaskNode) -> Result<()> {
        let invocation = translate::plan(&self.settings, root, task);

        for dir in &invocation.create_dirs {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }

        info!(
            task = %task.id,
            toolchain = %self.name,
            program = %invocation.program.display(),
            args = ?invocation.args,
            "invoking toolchain"
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&invocation.env)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(task = %task.id, toolchain = %self.name, error = %e, "failed to start tool");
                return Err(self.failure(
                    task,
                    None,
                    format!("failed to start '{}': {e}", invocation.program.display()),
                ));
            }
        };

        // Always drain both pipes so the child never blocks on a full buffer.
        let stdout = child
            .stdout
            .take()
            .map(|s| tokio::spawn(capture(s, task.id.clone(), "stdout")));
        let stderr = child
            .stderr
            .take()
            .map(|s| tokio::spawn(capture(s, task.id.clone(), "stderr")));

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for toolchain '{}' (task '{}')", self.name, task.id))?;

        let stdout = joined(stdout).await;
        let stderr = joined(stderr).await;

        info!(
            task = %task.id,
            toolchain = %self.name,
            exit_code = ?status.code(),
            success = status.success(),
            "tool exited"
        );

        if status.success() {
            return Ok(());
        }

        let mut diagnostics = String::from_utf8_lossy(&stdout).into_owned();
        if !diagnostics.is_empty() && !diagnostics.ends_with('\n') && !stderr.is_empty() {
            diagnostics.push('\n');
        }
        diagnostics.push_str(&String::from_utf8_lossy(&stderr));

        Err(self.failure(task, status.code(), diagnostics))
    }
}

impl Toolchain for ProcessToolchain {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        self.settings.capability
    }

    fn signature(&self) -> String {
        let s = &self.settings;
        format!(
            "{} {} {:?} {:?} {:?}",
            s.capability, s.program, s.args, s.env, s.cwd
        )
    }

    fn execute<'a>(&'a self, root: &'a Path, task: &'a TaskNode) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.run(root, task))
    }
}

/// Read a pipe to the end, logging each line.
async fn capture<R>(reader: R, task: String, stream: &'static str) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut all = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                debug!(task = %task, stream, "{}", String::from_utf8_lossy(&line).trim_end());
                all.extend_from_slice(&line);
            }
            Err(e) => {
                warn!(task = %task, stream, error = %e, "error reading tool output");
                break;
            }
        }
    }
    all
}

async fn joined(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    }
}
