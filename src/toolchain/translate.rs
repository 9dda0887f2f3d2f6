// src/toolchain/translate.rs

//! Translate a task node into a concrete tool invocation.
//!
//! Arguments (toolchain base args followed by task args) may contain
//! placeholders, expanded to absolute paths:
//!
//! | placeholder   | value                                          |
//! |---------------|------------------------------------------------|
//! | `{inputs}`    | every declared input                           |
//! | `{outputs}`   | every declared output                          |
//! | `{out}`       | the first declared output                      |
//! | `{artifacts}` | the cache directory of every used artifact     |
//! | `{target}`    | the task's target triple (empty when unset)    |
//! | `{task}`      | the task id                                    |
//!
//! An argument that is exactly a list placeholder expands to one argument per
//! element; inside a longer argument the elements are joined with spaces.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::dag::{TaskAction, TaskNode};
use crate::types::Capability;

/// Path list of the resolved artifact directories a task uses.
pub const ARTIFACTS_ENV: &str = "BUILDWEAVE_ARTIFACTS";
/// Target triple of a compile task.
pub const TARGET_ENV: &str = "BUILDWEAVE_TARGET";
/// First declared output of a package task.
pub const OUT_ENV: &str = "BUILDWEAVE_OUT";

const PATH_LIST_SEP: &str = if cfg!(windows) { ";" } else { ":" };

/// How a toolchain is configured, independent of any task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub capability: Capability,
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Working directory relative to the project root.
    pub cwd: Option<PathBuf>,
}

/// Everything needed to spawn the tool for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
    /// Directories that must exist before the tool starts.
    pub create_dirs: Vec<PathBuf>,
}

struct Placeholders {
    inputs: Vec<String>,
    outputs: Vec<String>,
    artifacts: Vec<String>,
    out: String,
    target: String,
    task: String,
}

impl Placeholders {
    fn list(&self, name: &str) -> Option<&[String]> {
        match name {
            "{inputs}" => Some(&self.inputs),
            "{outputs}" => Some(&self.outputs),
            "{artifacts}" => Some(&self.artifacts),
            _ => None,
        }
    }

    fn expand(&self, arg: &str) -> Vec<String> {
        if let Some(list) = self.list(arg) {
            return list.to_vec();
        }
        let expanded = arg
            .replace("{inputs}", &self.inputs.join(" "))
            .replace("{outputs}", &self.outputs.join(" "))
            .replace("{artifacts}", &self.artifacts.join(" "))
            .replace("{out}", &self.out)
            .replace("{target}", &self.target)
            .replace("{task}", &self.task);
        vec![expanded]
    }
}

fn absolute(root: &Path, path: &Path) -> String {
    root.join(path).to_string_lossy().into_owned()
}

/// Build the invocation of `tool` for `task`.
pub fn plan(tool: &ToolSettings, root: &Path, task: &TaskNode) -> Invocation {
    let (task_args, task_env, target, profile) = match &task.action {
        TaskAction::Toolchain {
            args,
            env,
            target,
            profile,
            ..
        } => (args.as_slice(), Some(env), target.as_deref(), profile.as_deref()),
        TaskAction::Clean { .. } => (&[][..], None, None, None),
    };

    let vars = Placeholders {
        inputs: task.inputs.iter().map(|p| absolute(root, p)).collect(),
        outputs: task.outputs.iter().map(|p| absolute(root, p)).collect(),
        artifacts: task
            .uses
            .iter()
            .map(|a| a.path.to_string_lossy().into_owned())
            .collect(),
        out: task
            .outputs
            .first()
            .map(|p| absolute(root, p))
            .unwrap_or_default(),
        target: target.unwrap_or_default().to_string(),
        task: task.id.clone(),
    };

    let mut args: Vec<String> = tool
        .args
        .iter()
        .chain(task_args)
        .flat_map(|a| vars.expand(a))
        .collect();

    let mut env = BTreeMap::new();
    env.insert(ARTIFACTS_ENV.to_string(), vars.artifacts.join(PATH_LIST_SEP));

    let mut create_dirs = Vec::new();

    match tool.capability {
        Capability::Compile => {
            if let Some(triple) = target {
                let mentioned = args
                    .iter()
                    .any(|a| a == "--target" || a.starts_with("--target="));
                if !mentioned {
                    args.push("--target".to_string());
                    args.push(triple.to_string());
                }
                env.insert(TARGET_ENV.to_string(), triple.to_string());
            }
            if profile == Some("release") && !args.iter().any(|a| a == "--release") {
                args.push("--release".to_string());
            }
        }
        Capability::Package => {
            for output in &task.outputs {
                if let Some(parent) = root.join(output).parent() {
                    if !create_dirs.iter().any(|d: &PathBuf| d == parent) {
                        create_dirs.push(parent.to_path_buf());
                    }
                }
            }
            if !vars.out.is_empty() {
                env.insert(OUT_ENV.to_string(), vars.out.clone());
            }
        }
    }

    // Configured variables win over the built-in ones; task over toolchain.
    env.extend(tool.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    if let Some(task_env) = task_env {
        env.extend(task_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let cwd = tool
        .cwd
        .as_ref()
        .map(|c| root.join(c))
        .unwrap_or_else(|| root.to_path_buf());

    Invocation {
        program: program_path(&cwd, &tool.program),
        args,
        env,
        cwd,
        create_dirs,
    }
}

/// Programs given as a relative path (`./gradlew`) are anchored at the
/// tool's working directory; bare names are looked up on `PATH`.
fn program_path(cwd: &Path, program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_tool() -> ToolSettings {
        ToolSettings {
            capability: Capability::Compile,
            program: "cargo".to_string(),
            args: vec!["build".to_string()],
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    fn package_tool() -> ToolSettings {
        ToolSettings {
            capability: Capability::Package,
            program: "./gradlew".to_string(),
            args: vec!["assemble".to_string(), "-Pout={out}".to_string()],
            env: BTreeMap::new(),
            cwd: Some(PathBuf::from("android")),
        }
    }

    fn with_target(mut node: TaskNode, triple: &str, release: bool) -> TaskNode {
        if let TaskAction::Toolchain {
            target, profile, ..
        } = &mut node.action
        {
            *target = Some(triple.to_string());
            if release {
                *profile = Some("release".to_string());
            }
        }
        node
    }

    #[test]
    fn compile_appends_target_and_release() {
        let root = Path::new("/proj");
        let node = with_target(
            TaskNode::new("native", "rust").input("native/src"),
            "aarch64-linux-android",
            true,
        );

        let inv = plan(&compile_tool(), root, &node);

        assert_eq!(
            inv.args,
            vec!["build", "--target", "aarch64-linux-android", "--release"]
        );
        assert_eq!(
            inv.env.get(TARGET_ENV).map(String::as_str),
            Some("aarch64-linux-android")
        );
        assert_eq!(inv.program, PathBuf::from("cargo"));
        assert_eq!(inv.cwd, PathBuf::from("/proj"));
        assert!(inv.create_dirs.is_empty());
    }

    #[test]
    fn compile_keeps_explicit_target() {
        let node = with_target(
            TaskNode::new("native", "rust").arg("--target=x86_64-unknown-linux-gnu"),
            "aarch64-linux-android",
            false,
        );

        let inv = plan(&compile_tool(), Path::new("/proj"), &node);

        assert_eq!(inv.args, vec!["build", "--target=x86_64-unknown-linux-gnu"]);
    }

    #[test]
    fn package_creates_output_dirs_and_expands_out() {
        let node = TaskNode::new("apk", "gradle")
            .input("native/target/libmain.so")
            .output("dist/app.apk");

        let inv = plan(&package_tool(), Path::new("/proj"), &node);

        assert_eq!(inv.program, PathBuf::from("/proj/android/./gradlew"));
        assert_eq!(inv.args, vec!["assemble", "-Pout=/proj/dist/app.apk"]);
        assert_eq!(inv.cwd, PathBuf::from("/proj/android"));
        assert_eq!(inv.create_dirs, vec![PathBuf::from("/proj/dist")]);
        assert_eq!(
            inv.env.get(OUT_ENV).map(String::as_str),
            Some("/proj/dist/app.apk")
        );
    }

    #[test]
    fn relative_program_without_cwd_is_anchored_at_root() {
        let mut tool = compile_tool();
        tool.program = "tools/cc-wrapper".to_string();

        let inv = plan(&tool, Path::new("/proj"), &TaskNode::new("t", "cc"));

        assert_eq!(inv.program, PathBuf::from("/proj/tools/cc-wrapper"));
    }

    #[test]
    fn list_placeholder_expands_to_one_arg_per_path() {
        let node = TaskNode::new("t", "rust")
            .input("a.txt")
            .input("b.txt")
            .arg("{inputs}")
            .arg("--name={task}");

        let inv = plan(&compile_tool(), Path::new("/proj"), &node);

        assert_eq!(
            inv.args,
            vec!["build", "/proj/a.txt", "/proj/b.txt", "--name=t"]
        );
    }

    #[test]
    fn task_env_overrides_toolchain_env() {
        let mut tool = compile_tool();
        tool.env.insert("MODE".to_string(), "tool".to_string());
        let mut node = TaskNode::new("t", "rust");
        if let TaskAction::Toolchain { env, .. } = &mut node.action {
            env.insert("MODE".to_string(), "task".to_string());
        }

        let inv = plan(&tool, Path::new("/proj"), &node);

        assert_eq!(inv.env.get("MODE").map(String::as_str), Some("task"));
        assert_eq!(inv.env.get(ARTIFACTS_ENV).map(String::as_str), Some(""));
    }
}
