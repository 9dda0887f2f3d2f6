// tests/runtime_fake_executor.rs

mod common;
use crate::common::builders::{BuildConfigBuilder, TaskConfigBuilder};
use crate::common::init_tracing;

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use buildweave::config::BuildConfig;
use buildweave::dag::{Scheduler, TaskGraph, TaskGraphBuilder};
use buildweave::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use buildweave::report::BuildStatus;
use buildweave::resolve::ResolvedSet;
use buildweave::types::Capability;
use buildweave_test_utils::fake_executor::FakeExecutor;

type TestResult = Result<(), Box<dyn Error>>;

/// Chain A -> B -> C through files, plus D after A.
fn chain_config() -> BuildConfig {
    BuildConfigBuilder::new()
        .with_toolchain("cc", Capability::Compile, "cc")
        .with_task("A", TaskConfigBuilder::new("cc").input("src").output("out/a").build())
        .with_task("B", TaskConfigBuilder::new("cc").input("out/a").output("out/b").build())
        .with_task("C", TaskConfigBuilder::new("cc").input("out/b").output("out/c").build())
        .with_task("D", TaskConfigBuilder::new("cc").after("A").build())
        .build()
}

fn graph_of(cfg: &BuildConfig) -> TaskGraph {
    TaskGraphBuilder::from_config(cfg, &ResolvedSet::default())
        .unwrap()
        .build()
        .unwrap()
}

async fn run_with(executor: FakeExecutor, rx: mpsc::Receiver<RuntimeEvent>, jobs: usize, fail_fast: bool) -> buildweave::report::BuildReport {
    let core = CoreRuntime::new(
        Scheduler::new(graph_of(&chain_config())),
        RuntimeOptions { fail_fast, jobs },
    );
    let runtime = Runtime::new(core, rx, executor);

    match timeout(Duration::from_secs(3), runtime.run()).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => panic!("runtime returned an error: {e}"),
        Err(_) => panic!("runtime did not finish within 3 seconds"),
    }
}

#[tokio::test]
async fn runtime_with_fake_executor_runs_chain_in_order() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone());

    let report = run_with(executor, rt_rx, 1, false).await;

    let tasks_run = executed.lock().unwrap().clone();
    assert_eq!(tasks_run.len(), 4);
    let pos = |t: &str| tasks_run.iter().position(|x| x == t).unwrap();
    assert!(pos("A") < pos("B"));
    assert!(pos("B") < pos("C"));
    assert!(pos("A") < pos("D"));
    assert!(report.succeeded());

    Ok(())
}

#[tokio::test]
async fn runtime_with_fake_executor_blocks_dependents_of_failure() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone()).failing("B");

    let report = run_with(executor, rt_rx, 2, false).await;

    let mut tasks_run = executed.lock().unwrap().clone();
    tasks_run.sort();
    assert_eq!(tasks_run, vec!["A", "B", "D"]);
    assert_eq!(report.status_of("B"), Some(BuildStatus::Failed));
    assert_eq!(report.status_of("C"), Some(BuildStatus::Failed));
    assert_eq!(report.status_of("D"), Some(BuildStatus::Succeeded));

    Ok(())
}

#[tokio::test]
async fn shutdown_request_stops_dispatching() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    // Queued before the loop starts: handled right after the roots dispatch.
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(rt_tx, executed.clone());

    let report = run_with(executor, rt_rx, 1, false).await;

    assert_eq!(executed.lock().unwrap().clone(), vec!["A"]);
    assert_eq!(report.len(), 1);

    Ok(())
}
