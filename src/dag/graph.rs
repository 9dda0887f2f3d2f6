// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::config::BuildConfig;
use crate::dag::task_info::{normalize_path, TaskNode};
use crate::engine::TaskId;
use crate::errors::{BuildError, Result};
use crate::resolve::ResolvedSet;

/// Collects task declarations; [`TaskGraphBuilder::build`] turns them into a
/// validated [`TaskGraph`].
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: Vec<TaskNode>,
    with_clean: bool,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// One node per `[task.<id>]`, with `uses` taken from `resolved`.
    pub fn from_config(cfg: &BuildConfig, resolved: &ResolvedSet) -> Result<Self> {
        let mut builder = Self::new();
        for (id, task) in &cfg.task {
            builder.add_task(TaskNode::from_config(id, task, cfg, resolved)?);
        }
        Ok(builder)
    }

    /// Register a node. Problems are reported by `build`.
    pub fn add_task(&mut self, node: TaskNode) -> &mut Self {
        self.tasks.push(node);
        self
    }

    /// Prepend the built-in clean task: every other task runs after it.
    pub fn with_clean_node(mut self) -> Self {
        self.with_clean = true;
        self
    }

    /// Validate the declarations and derive the edges.
    ///
    /// Task `A` depends on task `B` when one of `A`'s inputs is one of `B`'s
    /// outputs, lies inside an output directory of `B`, or is a directory
    /// containing an output of `B`; `after` adds explicit edges.
    ///
    /// Errors, all raised before anything executes:
    /// - `AmbiguousOutput` when two tasks declare the same output;
    /// - `CyclicDependency` naming every task of a cycle;
    /// - `Config` for duplicate ids or unknown `after` entries.
    pub fn build(self) -> Result<TaskGraph> {
        let mut tasks = self.tasks;

        if self.with_clean {
            let outputs = tasks.iter().flat_map(|t| t.outputs.iter().cloned()).collect();
            tasks.insert(0, TaskNode::clean(outputs));
        }

        ensure_unique_ids(&tasks)?;
        ensure_unique_outputs(&tasks)?;

        let index_of: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();

        // Edge direction: producer -> consumer.
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..tasks.len()).map(|i| graph.add_node(i)).collect();

        for (consumer, task) in tasks.iter().enumerate() {
            for (producer, other) in tasks.iter().enumerate() {
                if produces_input_of(other, task) {
                    graph.update_edge(nodes[producer], nodes[consumer], ());
                }
            }

            for dep in &task.after {
                let Some(&producer) = index_of.get(dep.as_str()) else {
                    return Err(BuildError::Config(format!(
                        "task '{}' has unknown dependency '{}' in `after`",
                        task.id, dep
                    )));
                };
                graph.update_edge(nodes[producer], nodes[consumer], ());
            }

            if self.with_clean && !task.is_clean() {
                graph.update_edge(nodes[0], nodes[consumer], ());
            }
        }

        let order = match toposort(&graph, None) {
            Ok(order) => order,
            Err(_) => {
                let cycle = find_cycle(&graph)
                    .into_iter()
                    .map(|n| tasks[graph[n]].id.clone())
                    .collect();
                return Err(BuildError::CyclicDependency { cycle });
            }
        };

        let mut deps: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for edge in graph.raw_edges() {
            let producer = tasks[graph[edge.source()]].id.clone();
            let consumer = tasks[graph[edge.target()]].id.clone();
            deps.entry(consumer.clone()).or_default().push(producer.clone());
            dependents.entry(producer).or_default().push(consumer);
        }
        for list in deps.values_mut().chain(dependents.values_mut()) {
            list.sort();
        }

        let order: Vec<TaskId> = order.into_iter().map(|n| tasks[graph[n]].id.clone()).collect();
        let nodes = tasks
            .into_iter()
            .map(|t| (t.id.clone(), Arc::new(t)))
            .collect();

        debug!(?order, "built task graph");

        Ok(TaskGraph {
            nodes,
            order,
            deps,
            dependents,
        })
    }
}

fn ensure_unique_ids(tasks: &[TaskNode]) -> Result<()> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(BuildError::Config(format!(
                "task '{}' is declared more than once",
                task.id
            )));
        }
    }
    Ok(())
}

fn ensure_unique_outputs(tasks: &[TaskNode]) -> Result<()> {
    let mut producers: BTreeMap<&Path, Vec<String>> = BTreeMap::new();
    for task in tasks {
        let mut own = HashSet::new();
        for output in &task.outputs {
            if own.insert(output.as_path()) {
                producers.entry(output.as_path()).or_default().push(task.id.clone());
            }
        }
    }

    for (output, mut ids) in producers {
        if ids.len() > 1 {
            ids.sort();
            return Err(BuildError::AmbiguousOutput {
                output: output.to_string_lossy().into_owned(),
                producers: ids,
            });
        }
    }
    Ok(())
}

/// Whether `consumer` reads something `producer` writes.
fn produces_input_of(producer: &TaskNode, consumer: &TaskNode) -> bool {
    consumer.inputs.iter().any(|input| {
        producer
            .outputs
            .iter()
            .any(|output| paths_overlap(input, output))
    })
}

/// Component-wise containment in either direction (equality included).
fn paths_overlap(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Nodes of one cycle in `graph`, in edge order, starting from the node with
/// the lowest task index. Only called when `toposort` failed.
fn find_cycle(graph: &DiGraph<usize, ()>) -> Vec<NodeIndex> {
    for scc in tarjan_scc(graph) {
        let is_cycle = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
        if !is_cycle {
            continue;
        }

        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let Some(&start) = scc.iter().min_by_key(|n| graph[**n]) else {
            continue;
        };
        if scc.len() == 1 {
            return vec![start];
        }

        // DFS inside the component for a path back to `start`.
        let mut path = vec![start];
        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        if extend_to(graph, &members, start, &mut path, &mut visited) {
            return path;
        }
        let mut sorted = scc;
        sorted.sort_by_key(|n| graph[*n]);
        return sorted;
    }
    Vec::new()
}

fn extend_to(
    graph: &DiGraph<usize, ()>,
    members: &HashSet<NodeIndex>,
    start: NodeIndex,
    path: &mut Vec<NodeIndex>,
    visited: &mut HashSet<NodeIndex>,
) -> bool {
    let Some(&current) = path.last() else {
        return false;
    };
    let mut next: Vec<NodeIndex> = graph
        .neighbors(current)
        .filter(|n| members.contains(n))
        .collect();
    next.sort_by_key(|n| graph[*n]);

    for n in next {
        if n == start {
            return true;
        }
        if visited.insert(n) {
            path.push(n);
            if extend_to(graph, members, start, path, visited) {
                return true;
            }
            path.pop();
        }
    }
    false
}

/// Validated, acyclic task graph.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: HashMap<TaskId, Arc<TaskNode>>,
    /// A topological order of all task ids.
    order: Vec<TaskId>,
    deps: HashMap<TaskId, Vec<TaskId>>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

impl TaskGraph {
    /// Task ids in a topological order (producers before consumers).
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn topological_order(&self) -> &[TaskId] {
        &self.order
    }

    pub fn node(&self, id: &str) -> Option<&Arc<TaskNode>> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate dependencies of a task (tasks that must finish first).
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.deps.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that wait for this one).
    pub fn dependents_of(&self, id: &str) -> &[TaskId] {
        self.dependents.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Tasks with no dependencies, in topological order.
    pub fn roots(&self) -> Vec<&str> {
        self.tasks()
            .filter(|id| self.dependencies_of(id).is_empty())
            .collect()
    }

    /// Every declared output of every node.
    pub fn declared_outputs(&self) -> Vec<PathBuf> {
        let mut outputs: Vec<PathBuf> = self
            .nodes
            .values()
            .flat_map(|n| n.outputs.iter().cloned())
            .collect();
        outputs.sort();
        outputs
    }
}

/// The graph containing only the clean task.
pub fn clean_only_graph(cfg: &BuildConfig) -> Result<TaskGraph> {
    let outputs: Vec<PathBuf> = cfg
        .task
        .values()
        .flat_map(|t| t.outputs.iter())
        .map(|p| normalize_path(Path::new(p)))
        .collect();
    let mut builder = TaskGraphBuilder::new();
    builder.add_task(TaskNode::clean(outputs));
    builder.build()
}
