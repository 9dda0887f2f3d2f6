// tests/orchestrator.rs

mod common;
use crate::common::{
    init_tracing, options, orchestrator, orchestrator_with_store, with_timeout, write_file,
    FakeToolchain,
};

use std::sync::Arc;
use std::time::Duration;

use buildweave::dag::{TaskGraph, TaskGraphBuilder, TaskNode, CLEAN_TASK_ID};
use buildweave::engine::Orchestrator;
use buildweave::errors::BuildError;
use buildweave::fingerprint::FingerprintStore;
use buildweave::report::BuildStatus;
use buildweave::toolchain::ToolchainRegistry;

/// native -> package, plus an independent docs task.
fn app_graph(with_clean: bool) -> TaskGraph {
    let mut builder = TaskGraphBuilder::new();
    builder
        .add_task(
            TaskNode::new("native", "fake")
                .input("native/src")
                .output("native/target/libmain.so"),
        )
        .add_task(
            TaskNode::new("package", "fake")
                .input("native/target/libmain.so")
                .input("android/app")
                .output("dist/app.apk"),
        )
        .add_task(TaskNode::new("docs", "fake").input("docs").output("dist/docs"));
    let builder = if with_clean {
        builder.with_clean_node()
    } else {
        builder
    };
    builder.build().unwrap()
}

fn seed_sources(root: &std::path::Path) {
    write_file(root, "native/src/lib.rs", "pub fn main() {}");
    write_file(root, "android/app/Main.kt", "class Main");
    write_file(root, "docs/index.md", "# docs");
}

fn position(order: &[String], task: &str) -> usize {
    order.iter().position(|t| t == task).unwrap()
}

#[tokio::test]
async fn producers_run_before_consumers() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");

    let report = with_timeout(orchestrator(dir.path(), &tool, options(false, 4)).run(app_graph(false)))
        .await
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.len(), 3);
    let order = tool.invocations();
    assert!(position(&order, "native") < position(&order, "package"));
    assert!(dir.path().join("dist/app.apk").exists());
    assert_eq!(report.status_of("package"), Some(BuildStatus::Succeeded));
}

#[tokio::test]
async fn second_build_of_unchanged_project_skips_everything() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");
    let orch = orchestrator(dir.path(), &tool, options(false, 2));

    let first = orch.run(app_graph(false)).await.unwrap();
    assert!(first.succeeded());
    tool.clear_invocations();

    let second = orch.run(app_graph(false)).await.unwrap();

    assert!(tool.invocations().is_empty());
    for task in ["native", "package", "docs"] {
        assert_eq!(second.status_of(task), Some(BuildStatus::SkippedCached), "{task}");
    }
    let package = second.get("package").unwrap();
    assert_eq!(package.produced.len(), 1);
}

#[tokio::test]
async fn changed_input_reruns_only_affected_task() {
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");
    let orch = orchestrator(dir.path(), &tool, options(false, 2));

    orch.run(app_graph(false)).await.unwrap();
    tool.clear_invocations();

    write_file(dir.path(), "native/src/lib.rs", "pub fn main() { changed() }");
    let report = orch.run(app_graph(false)).await.unwrap();

    assert_eq!(report.status_of("native"), Some(BuildStatus::Succeeded));
    // The fake rewrites libmain.so with identical bytes.
    assert_eq!(report.status_of("package"), Some(BuildStatus::SkippedCached));
    assert_eq!(report.status_of("docs"), Some(BuildStatus::SkippedCached));
    assert_eq!(tool.invocation_count("native"), 1);
}

#[tokio::test]
async fn toolchain_signature_change_invalidates_tasks() {
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");
    let orch = orchestrator(dir.path(), &tool, options(false, 2));

    orch.run(app_graph(false)).await.unwrap();
    tool.set_signature("fake --release");
    tool.clear_invocations();

    let report = orch.run(app_graph(false)).await.unwrap();
    assert_eq!(report.tasks_with(BuildStatus::Succeeded).len(), 3);
}

#[tokio::test]
async fn deleted_output_forces_rerun() {
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");
    let orch = orchestrator(dir.path(), &tool, options(false, 2));

    orch.run(app_graph(false)).await.unwrap();
    std::fs::remove_file(dir.path().join("dist/app.apk")).unwrap();
    tool.clear_invocations();

    let report = orch.run(app_graph(false)).await.unwrap();
    assert_eq!(report.status_of("package"), Some(BuildStatus::Succeeded));
    assert_eq!(report.status_of("native"), Some(BuildStatus::SkippedCached));
    assert_eq!(tool.invocations(), vec!["package"]);
}

#[tokio::test]
async fn clean_build_reexecutes_everything() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");
    let store = Arc::new(FingerprintStore::open(dir.path().join(".buildweave/fingerprints.toml")).unwrap());
    let orch = orchestrator_with_store(dir.path(), &tool, options(false, 2), Arc::clone(&store));

    orch.run(app_graph(false)).await.unwrap();
    assert_eq!(store.len(), 3);
    tool.clear_invocations();

    let report = orch.run(app_graph(true)).await.unwrap();

    assert_eq!(report.status_of(CLEAN_TASK_ID), Some(BuildStatus::Succeeded));
    assert_eq!(report.results()[0].task, CLEAN_TASK_ID);
    for task in ["native", "package", "docs"] {
        assert_eq!(report.status_of(task), Some(BuildStatus::Succeeded), "{task}");
    }
    assert_eq!(tool.invocations().len(), 3);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn task_without_inputs_always_runs() {
    let dir = tempfile::tempdir().unwrap();
    let tool = FakeToolchain::new("fake");
    let orch = orchestrator(dir.path(), &tool, options(false, 1));

    let graph = || {
        let mut b = TaskGraphBuilder::new();
        b.add_task(TaskNode::new("stamp", "fake").output("out/stamp"));
        b.build().unwrap()
    };

    orch.run(graph()).await.unwrap();
    let report = orch.run(graph()).await.unwrap();

    assert_eq!(report.status_of("stamp"), Some(BuildStatus::Succeeded));
    assert_eq!(tool.invocation_count("stamp"), 2);
}

#[tokio::test]
async fn failure_without_fail_fast_blocks_dependents_only() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");
    tool.fail_task("native");

    let report = orchestrator(dir.path(), &tool, options(false, 1))
        .run(app_graph(false))
        .await
        .unwrap();

    assert!(report.has_failures());
    assert_eq!(report.status_of("native"), Some(BuildStatus::Failed));
    assert_eq!(report.status_of("docs"), Some(BuildStatus::Succeeded));
    assert_eq!(report.status_of("package"), Some(BuildStatus::Failed));
    assert_eq!(tool.invocation_count("package"), 0);

    let native = report.get("native").unwrap();
    assert!(matches!(
        native.error.as_ref(),
        Some(BuildError::ToolchainFailure { diagnostics, .. }) if diagnostics.contains("failed on purpose")
    ));
    let package = report.get("package").unwrap();
    assert!(matches!(
        package.error.as_ref(),
        Some(BuildError::DependencyFailed { dependency, .. }) if dependency == "native"
    ));
}

#[tokio::test]
async fn failed_task_is_not_recorded_and_reruns() {
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");
    let orch = orchestrator(dir.path(), &tool, options(false, 2));

    tool.fail_task("docs");
    orch.run(app_graph(false)).await.unwrap();
    assert!(orch.fingerprints().get("docs").is_none());

    tool.stop_failing("docs");
    tool.clear_invocations();
    let report = orch.run(app_graph(false)).await.unwrap();
    assert_eq!(report.status_of("docs"), Some(BuildStatus::Succeeded));
    assert_eq!(tool.invocations(), vec!["docs"]);
}

#[tokio::test]
async fn fail_fast_stops_dispatching_new_tasks() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let tool = FakeToolchain::new("fake");
    tool.fail_task("t0");

    // Ten independent tasks, one worker: t0 fails first, nothing else starts.
    let mut builder = TaskGraphBuilder::new();
    for i in 0..10 {
        builder.add_task(TaskNode::new(format!("t{i}"), "fake").output(format!("out/t{i}")));
    }
    let graph = builder.build().unwrap();
    let first = graph.topological_order()[0].clone();
    if first != "t0" {
        tool.stop_failing("t0");
        tool.fail_task(&first);
    }

    let report = orchestrator(dir.path(), &tool, options(true, 1))
        .run(graph)
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.status_of(&first), Some(BuildStatus::Failed));
    assert_eq!(tool.invocations(), vec![first]);
}

#[tokio::test]
async fn fail_fast_awaits_in_flight_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let fast = FakeToolchain::new("fast");
    let slow = FakeToolchain::new("slow").with_delay(Duration::from_millis(200));
    fast.fail_task("a");

    let mut toolchains = ToolchainRegistry::new();
    toolchains
        .register(Arc::new(fast.clone()))
        .register(Arc::new(slow.clone()));
    let orch = Orchestrator::new(
        dir.path(),
        toolchains,
        Arc::new(FingerprintStore::in_memory()),
        options(true, 2),
    );

    let mut builder = TaskGraphBuilder::new();
    builder
        .add_task(TaskNode::new("a", "fast").output("out/a"))
        .add_task(TaskNode::new("b", "slow").output("out/b"))
        .add_task(TaskNode::new("c", "fast").input("out/b").output("out/c"));

    let report = with_timeout(orch.run(builder.build().unwrap())).await.unwrap();

    assert_eq!(report.status_of("a"), Some(BuildStatus::Failed));
    // b was already running when a failed; it completes and keeps its output.
    assert_eq!(report.status_of("b"), Some(BuildStatus::Succeeded));
    assert!(dir.path().join("out/b").exists());
    assert_eq!(report.status_of("c"), None);
    assert_eq!(fast.invocation_count("c"), 0);
}

#[tokio::test]
async fn jobs_bound_is_never_exceeded() {
    let dir = tempfile::tempdir().unwrap();
    let tool = FakeToolchain::new("fake").with_delay(Duration::from_millis(20));

    let mut builder = TaskGraphBuilder::new();
    for i in 0..8 {
        builder.add_task(TaskNode::new(format!("t{i}"), "fake").output(format!("out/t{i}")));
    }

    let report = with_timeout(orchestrator(dir.path(), &tool, options(false, 3)).run(builder.build().unwrap()))
        .await
        .unwrap();

    assert_eq!(report.len(), 8);
    assert!(report.succeeded());
    assert!(tool.max_concurrency() <= 3);
    assert!(tool.max_concurrency() >= 2);
}

#[tokio::test]
async fn missing_declared_output_fails_the_task() {
    let dir = tempfile::tempdir().unwrap();
    seed_sources(dir.path());
    let tool = FakeToolchain::new("fake");
    tool.omit_outputs("native");

    let report = orchestrator(dir.path(), &tool, options(false, 2))
        .run(app_graph(false))
        .await
        .unwrap();

    assert_eq!(report.status_of("native"), Some(BuildStatus::Failed));
    match report.get("native").and_then(|r| r.error.as_ref()) {
        Some(BuildError::ToolchainFailure { diagnostics, .. }) => {
            assert!(diagnostics.contains("libmain.so"));
        }
        other => panic!("expected ToolchainFailure, got {other:?}"),
    }
    assert_eq!(report.status_of("package"), Some(BuildStatus::Failed));
}

#[tokio::test]
async fn missing_input_fails_the_task() {
    let dir = tempfile::tempdir().unwrap();
    let tool = FakeToolchain::new("fake");

    let mut builder = TaskGraphBuilder::new();
    builder.add_task(TaskNode::new("native", "fake").input("native/src").output("out/lib.so"));

    let report = orchestrator(dir.path(), &tool, options(false, 1))
        .run(builder.build().unwrap())
        .await
        .unwrap();

    assert_eq!(report.status_of("native"), Some(BuildStatus::Failed));
    assert!(tool.invocations().is_empty());
}

#[tokio::test]
async fn unknown_toolchain_fails_the_task() {
    let dir = tempfile::tempdir().unwrap();
    let tool = FakeToolchain::new("fake");

    let mut builder = TaskGraphBuilder::new();
    builder.add_task(TaskNode::new("native", "missing-tool").output("out/lib.so"));

    let report = orchestrator(dir.path(), &tool, options(false, 1))
        .run(builder.build().unwrap())
        .await
        .unwrap();

    assert!(matches!(
        report.get("native").and_then(|r| r.error.as_ref()),
        Some(BuildError::Config(msg)) if msg.contains("missing-tool")
    ));
}
