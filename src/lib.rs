// src/lib.rs

pub mod clean;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fingerprint;
pub mod logging;
pub mod report;
pub mod resolve;
pub mod sync;
pub mod toolchain;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{BuildArgs, CliArgs, Command};
use crate::config::{load_and_validate, BuildConfig};
use crate::dag::{clean_only_graph, TaskAction, TaskGraph, TaskGraphBuilder};
use crate::engine::{Orchestrator, RuntimeOptions};
use crate::report::{BuildReport, BuildStatus};
use crate::resolve::{
    coordinates_from_config, repositories_from_config, update_lockfile, ArtifactCache,
    ResolvedSet, Resolver,
};

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(true)` when every task succeeded or was up to date,
/// `Ok(false)` when at least one task failed, and `Err` for anything that
/// stops the build before a task runs (config, resolution, graph errors).
pub async fn run(args: CliArgs) -> Result<bool> {
    let cfg = load_and_validate(&args.config)?;
    debug!(config = ?args.config, root = ?cfg.root(), "loaded configuration");

    match args.command {
        Command::Build(build) => run_build(&cfg, &build).await,
        Command::Clean => run_clean(&cfg).await,
        Command::Resolve => {
            let resolved = resolve_dependencies(&cfg).await?;
            print_resolved(&resolved);
            Ok(true)
        }
    }
}

/// Resolve every `[[dependency]]` and refresh the lockfile.
pub async fn resolve_dependencies(cfg: &BuildConfig) -> crate::errors::Result<ResolvedSet> {
    let resolved = resolve_artifacts(cfg).await?;
    update_lockfile(&cfg.lockfile_path(), &resolved)?;
    Ok(resolved)
}

/// Resolve every `[[dependency]]` without touching the lockfile.
pub async fn resolve_artifacts(cfg: &BuildConfig) -> crate::errors::Result<ResolvedSet> {
    let resolver = Arc::new(Resolver::new(
        repositories_from_config(cfg),
        ArtifactCache::new(cfg.artifact_dir()),
    ));
    let resolved = resolver.resolve_all(&coordinates_from_config(cfg)).await?;
    info!(artifacts = resolved.len(), "dependencies resolved");
    Ok(resolved)
}

/// Build the task graph of `cfg` against an already resolved set.
pub fn graph_from_config(
    cfg: &BuildConfig,
    resolved: &ResolvedSet,
    with_clean: bool,
) -> crate::errors::Result<TaskGraph> {
    let builder = TaskGraphBuilder::from_config(cfg, resolved)?;
    let builder = if with_clean {
        builder.with_clean_node()
    } else {
        builder
    };
    builder.build()
}

/// Resolve, build the graph and run it.
pub async fn build(cfg: &BuildConfig, args: &BuildArgs) -> crate::errors::Result<BuildReport> {
    let resolved = resolve_dependencies(cfg).await?;
    let graph = graph_from_config(cfg, &resolved, args.clean)?;
    let orchestrator = Orchestrator::from_config(cfg, runtime_options(cfg, args))?.with_ctrl_c(true);
    orchestrator.run(graph).await
}

/// `[config]` values, overridden by CLI flags.
pub fn runtime_options(cfg: &BuildConfig, args: &BuildArgs) -> RuntimeOptions {
    let jobs = args
        .jobs
        .map(|j| usize::try_from(j).unwrap_or(usize::MAX))
        .or(cfg.config.jobs);
    RuntimeOptions::new(args.fail_fast || cfg.config.fail_fast, jobs)
}

async fn run_build(cfg: &BuildConfig, args: &BuildArgs) -> Result<bool> {
    if args.dry_run {
        let resolved = resolve_artifacts(cfg).await?;
        let graph = graph_from_config(cfg, &resolved, args.clean)?;
        print_dry_run(cfg, &graph, runtime_options(cfg, args));
        return Ok(true);
    }

    let report = build(cfg, args).await?;
    print_summary(&report);
    Ok(report.succeeded())
}

async fn run_clean(cfg: &BuildConfig) -> Result<bool> {
    let graph = clean_only_graph(cfg)?;
    let orchestrator = Orchestrator::from_config(cfg, RuntimeOptions::new(false, Some(1)))?;
    let report = orchestrator.run(graph).await?;
    print_summary(&report);
    Ok(report.succeeded())
}

fn print_resolved(resolved: &ResolvedSet) {
    println!("resolved artifacts ({}):", resolved.len());
    for artifact in resolved.iter() {
        println!(
            "  - {} from {} ({})",
            artifact.coordinate, artifact.repository, artifact.content_hash
        );
        println!("      path: {}", artifact.path.display());
    }
}

fn print_summary(report: &BuildReport) {
    println!("build results:");
    for result in report.results() {
        let label = match result.status {
            BuildStatus::Succeeded => "ok",
            BuildStatus::SkippedCached => "up to date",
            BuildStatus::Failed => "FAILED",
        };
        println!("  {label:>10}  {}", result.task);
        if let Some(err) = &result.error {
            for line in err.to_string().lines() {
                println!("              {line}");
            }
        }
    }

    let failed = report.tasks_with(BuildStatus::Failed).len();
    let skipped = report.tasks_with(BuildStatus::SkippedCached).len();
    let ran = report.tasks_with(BuildStatus::Succeeded).len();
    println!("{ran} executed, {skipped} up to date, {failed} failed");
}

/// Simple dry-run output: print the task order with each task's edges.
fn print_dry_run(cfg: &BuildConfig, graph: &TaskGraph, options: RuntimeOptions) {
    println!("buildweave dry-run");
    println!("  root = {}", cfg.root().display());
    println!("  jobs = {}", options.jobs);
    println!("  fail_fast = {}", options.fail_fast);
    println!();

    println!("tasks ({}), in execution order:", graph.len());
    for id in graph.tasks() {
        println!("  - {id}");
        let Some(node) = graph.node(id) else {
            continue;
        };
        if let TaskAction::Toolchain { toolchain, .. } = &node.action {
            println!("      toolchain: {toolchain}");
        }
        let deps = graph.dependencies_of(id);
        if !deps.is_empty() {
            println!("      after: {deps:?}");
        }
        if !node.inputs.is_empty() {
            println!("      inputs: {:?}", node.inputs);
        }
        if !node.outputs.is_empty() {
            println!("      outputs: {:?}", node.outputs);
        }
        for artifact in &node.uses {
            println!("      uses: {}", artifact.coordinate);
        }
    }

    debug!("dry-run complete (no execution)");
}
