// src/generator/collaborators.rs

//! Seams between the pipeline and the code that feeds it.
//!
//! Each trait is a synchronous call returning a fully materialized result.
//! Errors are plain `anyhow` errors; the generator wraps them with the
//! collaborator's name.

use anyhow::Result;

use crate::task::{Label, Task, TaskGraph};

/// Supplies the tasks of the full task graph.
pub trait TaskLoader {
    fn name(&self) -> &str {
        "loader"
    }

    /// All tasks, in the order they should appear in the graph.
    fn load_tasks(&self) -> Result<Vec<Task>>;
}

/// Picks the seed labels of the target task set.
pub trait TargetResolver {
    fn name(&self) -> &str {
        "target-resolver"
    }

    /// Seed labels, in seed order. Every label must name a task of `full`.
    fn target_tasks(&self, full: &TaskGraph) -> Result<Vec<Label>>;
}

/// Outcome of optimizing one task.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Keep the task unchanged.
    Keep,
    /// Drop the task from the graph.
    Remove,
    /// Substitute another task. The replacement may carry a new label.
    Replace(Task),
}

/// What the optimizer knows when asked about one task.
#[derive(Debug)]
pub struct OptimizeContext<'a> {
    /// The graph being optimized.
    pub graph: &'a TaskGraph,
    /// Decisions already taken for the direct dependents of the task.
    pub dependents: Vec<(&'a str, &'a Decision)>,
}

/// Decides, task by task, whether work can be skipped or replaced.
///
/// Called in reverse topological order: every dependent of a task has been
/// decided before the task itself.
pub trait Optimizer {
    fn name(&self) -> &str {
        "optimizer"
    }

    fn decide(&self, task: &Task, ctx: &OptimizeContext<'_>) -> Result<Decision>;
}

/// A structural rewrite applied after optimization.
pub trait MorphPass {
    fn name(&self) -> &str;

    /// Produce the tasks of the rewritten graph.
    fn apply(&self, graph: &TaskGraph) -> Result<Vec<Task>>;
}

/// Optimizer that keeps every task.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepAll;

impl Optimizer for KeepAll {
    fn name(&self) -> &str {
        "keep-all"
    }

    fn decide(&self, _task: &Task, _ctx: &OptimizeContext<'_>) -> Result<Decision> {
        Ok(Decision::Keep)
    }
}
