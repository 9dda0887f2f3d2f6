// tests/process_toolchain.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::fs;
use std::path::Path;

use buildweave::dag::{TaskAction, TaskNode};
use buildweave::errors::BuildError;
use buildweave::report::BuildStatus;
use buildweave::toolchain::{ProcessToolchain, Toolchain};
use buildweave::types::Capability;

/// `sh -c <script> sh <extra...>`: `$1` is the first extra argument.
fn shell(capability: Capability, script: &str) -> ProcessToolchain {
    ProcessToolchain::new("sh", capability, "sh")
        .arg("-c")
        .arg(script)
        .arg("sh")
}

fn failure_of(err: &BuildError) -> (Option<i32>, &str, &[String]) {
    match err {
        BuildError::ToolchainFailure {
            exit_code,
            diagnostics,
            highlights,
            ..
        } => (*exit_code, diagnostics.as_str(), highlights.as_slice()),
        other => panic!("expected a toolchain failure, got {other:?}"),
    }
}

#[tokio::test]
async fn successful_tool_writes_declared_output() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let tool = shell(Capability::Compile, "echo compiled > \"$1\"").arg("{out}");
    let task = TaskNode::new("native", "sh").output("libmain.so");

    let result = with_timeout(tool.invoke(dir.path(), &task)).await;

    assert_eq!(result.status, BuildStatus::Succeeded);
    assert_eq!(result.produced, vec![Path::new("libmain.so").to_path_buf()]);
    assert_eq!(
        fs::read_to_string(dir.path().join("libmain.so")).unwrap(),
        "compiled\n"
    );
}

#[tokio::test]
async fn failing_tool_keeps_output_verbatim() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let tool = shell(
        Capability::Compile,
        "echo '   Compiling native'; echo 'error[E0425]: cannot find value' >&2; exit 3",
    );
    let task = TaskNode::new("native", "sh");

    let result = with_timeout(tool.invoke(dir.path(), &task)).await;

    assert_eq!(result.status, BuildStatus::Failed);
    let (exit_code, diagnostics, highlights) = failure_of(result.error.as_ref().unwrap());
    assert_eq!(exit_code, Some(3));
    assert_eq!(
        diagnostics,
        "   Compiling native\nerror[E0425]: cannot find value\n"
    );
    assert_eq!(highlights, ["error[E0425]: cannot find value".to_string()]);
}

#[tokio::test]
async fn missing_program_is_a_toolchain_failure_without_exit_code() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let tool = ProcessToolchain::new("ghost", Capability::Compile, "/nonexistent/buildweave-tool");
    let task = TaskNode::new("native", "ghost");

    let err = with_timeout(tool.execute(dir.path(), &task))
        .await
        .unwrap_err();

    let (exit_code, diagnostics, _) = failure_of(&err);
    assert_eq!(exit_code, None);
    assert!(diagnostics.contains("failed to start"), "{diagnostics}");
}

#[tokio::test]
async fn package_tool_gets_output_dirs_and_env() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let tool = shell(Capability::Package, "echo packaged > \"$BUILDWEAVE_OUT\"");
    let task = TaskNode::new("apk", "sh").output("dist/android/app.apk");

    with_timeout(tool.execute(dir.path(), &task)).await.unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("dist/android/app.apk")).unwrap(),
        "packaged\n"
    );
}

#[tokio::test]
async fn compile_tool_sees_target_and_task_env() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let tool = shell(
        Capability::Compile,
        "printf '%s %s' \"$BUILDWEAVE_TARGET\" \"$MODE\" > \"$1\"",
    )
    .arg("{out}")
    .env("MODE", "toolchain");

    let mut task = TaskNode::new("native", "sh").output("env.txt");
    if let TaskAction::Toolchain { target, env, .. } = &mut task.action {
        *target = Some("aarch64-linux-android".to_string());
        env.insert("MODE".to_string(), "task".to_string());
    }

    with_timeout(tool.execute(dir.path(), &task)).await.unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("env.txt")).unwrap(),
        "aarch64-linux-android task"
    );
}

#[tokio::test]
async fn toolchain_cwd_is_relative_to_root() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("android")).unwrap();
    let tool = shell(Capability::Package, "pwd > \"$BUILDWEAVE_OUT\"").cwd("android");
    let task = TaskNode::new("apk", "sh").output("out/pwd.txt");

    with_timeout(tool.execute(dir.path(), &task)).await.unwrap();

    let pwd = fs::read_to_string(dir.path().join("out/pwd.txt")).unwrap();
    let expected = fs::canonicalize(dir.path().join("android")).unwrap();
    assert_eq!(fs::canonicalize(pwd.trim()).unwrap(), expected);
}
