//! Named tasks, their ordering constraints and their execution.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::TaskError;
use crate::pipeline::Pipeline;

/// Target that stands for every registered task.
pub const BUILD_TARGET: &str = "build";

/// A named pipeline plus the tasks it must run after.
#[derive(Clone)]
pub struct Task {
    name: String,
    description: String,
    after: Vec<String>,
    pipeline: Arc<Pipeline>,
}

impl Task {
    pub fn new(name: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            after: Vec::new(),
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare predecessors.
    pub fn after<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(tasks.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn predecessors(&self) -> &[String] {
        &self.after
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the pipeline on the blocking pool. Resolves once every output
    /// file has been written.
    pub async fn run(&self) -> Result<TaskReport, TaskError> {
        let started = Instant::now();
        tracing::info!("Starting '{}'...", self.name);

        let pipeline = Arc::clone(&self.pipeline);
        let name = self.name.clone();
        let outcome = tokio::task::spawn_blocking(move || pipeline.run(&name))
            .await
            .map_err(|e| TaskError::Join {
                task: self.name.clone(),
                message: e.to_string(),
            })??;

        let report = TaskReport {
            task: self.name.clone(),
            matched: outcome.matched,
            written: outcome.written,
            failed: outcome.failed,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        if report.is_success() {
            tracing::info!(
                "Finished '{}' after {} ms ({} written)",
                report.task,
                report.duration_ms,
                report.written.len()
            );
        } else {
            tracing::warn!(
                "Finished '{}' after {} ms with {} failed file(s)",
                report.task,
                report.duration_ms,
                report.failed
            );
        }

        Ok(report)
    }
}

/// Completion record of one task invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub task: String,
    pub matched: usize,
    pub written: Vec<PathBuf>,
    pub failed: usize,
    pub duration_ms: u64,
}

impl TaskReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// All known tasks, by name.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Task) -> Result<(), TaskError> {
        if task.name == BUILD_TARGET || self.tasks.contains_key(&task.name) {
            return Err(TaskError::Duplicate(task.name));
        }
        tracing::debug!("Registered task {}", task.name);
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Task names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Order in which `targets` run.
    ///
    /// With `with_deps`, the targets and all their transitive predecessors
    /// are ordered so every task follows the tasks it declares. Without it,
    /// exactly the named tasks run in the given order. `build` expands to
    /// every registered task.
    pub fn plan(&self, targets: &[String], with_deps: bool) -> Result<Vec<String>, TaskError> {
        let mut requested: Vec<&str> = Vec::new();
        for target in targets {
            if target == BUILD_TARGET {
                requested.extend(self.names());
            } else if self.tasks.contains_key(target) {
                requested.push(target.as_str());
            } else {
                return Err(TaskError::UnknownTask(target.clone()));
            }
        }

        if !with_deps {
            let mut order: Vec<String> = Vec::new();
            for name in requested {
                if !order.iter().any(|n| n == name) {
                    order.push(name.to_string());
                }
            }
            return Ok(order);
        }

        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        let mut pending = requested;

        while let Some(name) = pending.pop() {
            if nodes.contains_key(name) {
                continue;
            }
            nodes.insert(name, graph.add_node(name));

            let task = self
                .tasks
                .get(name)
                .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;
            for dependency in &task.after {
                if !self.tasks.contains_key(dependency) {
                    return Err(TaskError::UnknownDependency {
                        task: name.to_string(),
                        dependency: dependency.clone(),
                    });
                }
                pending.push(dependency.as_str());
            }
        }

        for (&name, &node) in &nodes {
            for dependency in &self.tasks[name].after {
                graph.add_edge(nodes[dependency.as_str()], node, ());
            }
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| TaskError::Cycle(graph[cycle.node_id()].to_string()))?;

        Ok(order.into_iter().map(|n| graph[n].to_string()).collect())
    }

    /// Run `targets` one task at a time in planned order.
    pub async fn run(
        &self,
        targets: &[String],
        with_deps: bool,
    ) -> Result<Vec<TaskReport>, TaskError> {
        let order = self.plan(targets, with_deps)?;
        tracing::debug!("Task order: {}", order.join(" -> "));

        let mut reports = Vec::with_capacity(order.len());
        for name in &order {
            let task = self
                .tasks
                .get(name)
                .ok_or_else(|| TaskError::UnknownTask(name.clone()))?;
            reports.push(task.run().await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Input, Sink};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn noop() -> Pipeline {
        Pipeline::new(Input::globs(Vec::<String>::new()), Sink::dir("unused"))
    }

    fn registry(edges: &[(&str, &[&str])]) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for (name, after) in edges {
            registry
                .register(Task::new(*name, noop()).after(after.iter().copied()))
                .unwrap();
        }
        registry
    }

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn predecessors_run_first() {
        let registry = registry(&[
            ("render", &[]),
            ("compile", &[]),
            ("bundle", &["compile", "render"]),
            ("finalize", &["render", "bundle"]),
        ]);

        let order = registry.plan(&targets(&["finalize"]), true).unwrap();

        assert_eq!(order.len(), 4);
        assert!(position(&order, "render") < position(&order, "bundle"));
        assert!(position(&order, "compile") < position(&order, "bundle"));
        assert!(position(&order, "bundle") < position(&order, "finalize"));
    }

    #[test]
    fn no_deps_keeps_given_order() {
        let registry = registry(&[("a", &[]), ("b", &["a"])]);

        let order = registry.plan(&targets(&["b", "a", "b"]), false).unwrap();

        assert_eq!(order, targets(&["b", "a"]));
    }

    #[test]
    fn build_expands_to_everything() {
        let registry = registry(&[("a", &[]), ("b", &["a"]), ("c", &[])]);

        let order = registry.plan(&targets(&["build"]), true).unwrap();

        assert_eq!(order.len(), 3);
        assert!(position(&order, "a") < position(&order, "b"));
    }

    #[test]
    fn rejects_unknown_task() {
        let registry = registry(&[("a", &[])]);

        let err = registry.plan(&targets(&["nope"]), true).unwrap_err();

        assert!(matches!(err, TaskError::UnknownTask(ref n) if n == "nope"));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let registry = registry(&[("a", &["ghost"])]);

        let err = registry.plan(&targets(&["a"]), true).unwrap_err();

        assert!(matches!(err, TaskError::UnknownDependency { ref dependency, .. } if dependency == "ghost"));
    }

    #[test]
    fn rejects_cycles() {
        let registry = registry(&[("a", &["b"]), ("b", &["a"])]);

        let err = registry.plan(&targets(&["a"]), true).unwrap_err();

        assert!(matches!(err, TaskError::Cycle(_)));
    }

    #[test]
    fn rejects_duplicates_and_reserved_name() {
        let mut registry = registry(&[("a", &[])]);

        assert!(matches!(
            registry.register(Task::new("a", noop())),
            Err(TaskError::Duplicate(_))
        ));
        assert!(registry.register(Task::new("build", noop())).is_err());
    }

    #[tokio::test]
    async fn run_resolves_with_reports_in_order() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        let out = temp.path().join("out");

        let mut registry = TaskRegistry::new();
        registry
            .register(Task::new(
                "copy",
                Pipeline::new(
                    Input::globs([temp.path().join("*.txt").display().to_string()]),
                    Sink::dir(&out),
                ),
            ))
            .unwrap();
        registry
            .register(Task::new("after-copy", noop()).after(["copy"]))
            .unwrap();

        let reports = registry.run(&targets(&["after-copy"]), true).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].task, "copy");
        assert_eq!(reports[0].written, vec![out.join("a.txt")]);
        assert!(reports.iter().all(TaskReport::is_success));
        // Output exists by the time the future resolves
        assert!(out.join("a.txt").exists());
    }
}
