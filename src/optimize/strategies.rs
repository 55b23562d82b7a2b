// src/optimize/strategies.rs

//! Directive-driven optimization.
//!
//! A task's `optimization` value is a single-key object such as
//! `{"always": null}`; the key selects a registered strategy and the value is
//! handed to it as its argument. Tasks without a directive are kept.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use serde_json::Value;
use tracing::debug;

use crate::generator::collaborators::{Decision, OptimizeContext, Optimizer};
use crate::task::Task;

/// A named way of deciding whether a task can be skipped.
pub trait OptimizationStrategy {
    /// Whether `task` can be dropped from the graph.
    fn should_remove(&self, task: &Task, arg: &Value) -> Result<bool>;

    /// A task to run instead of `task`, if any.
    fn replacement(&self, _task: &Task, _arg: &Value) -> Result<Option<Task>> {
        Ok(None)
    }
}

/// Always removes the task.
#[derive(Debug, Default, Clone, Copy)]
pub struct Always;

impl OptimizationStrategy for Always {
    fn should_remove(&self, _task: &Task, _arg: &Value) -> Result<bool> {
        Ok(true)
    }
}

/// Never removes the task.
#[derive(Debug, Default, Clone, Copy)]
pub struct Never;

impl OptimizationStrategy for Never {
    fn should_remove(&self, _task: &Task, _arg: &Value) -> Result<bool> {
        Ok(false)
    }
}

/// [`Optimizer`] dispatching on each task's `optimization` directive.
pub struct StrategyOptimizer {
    strategies: BTreeMap<String, Box<dyn OptimizationStrategy>>,
}

impl StrategyOptimizer {
    /// Registry without any strategy.
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `always` and `never` strategies.
    pub fn with_builtins() -> Self {
        Self::empty()
            .register("always", Always)
            .register("never", Never)
    }

    pub fn register<S>(mut self, name: impl Into<String>, strategy: S) -> Self
    where
        S: OptimizationStrategy + 'static,
    {
        self.strategies.insert(name.into(), Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}

impl Default for StrategyOptimizer {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for StrategyOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyOptimizer")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Optimizer for StrategyOptimizer {
    fn name(&self) -> &str {
        "strategies"
    }

    fn decide(&self, task: &Task, _ctx: &OptimizeContext<'_>) -> Result<Decision> {
        let Some(directive) = task.optimization() else {
            return Ok(Decision::Keep);
        };

        let (name, arg) = match directive {
            Value::Object(fields) if fields.len() == 1 => fields
                .iter()
                .next()
                .ok_or_else(|| anyhow!("task '{}': empty optimization directive", task.label()))?,
            Value::Null => return Ok(Decision::Keep),
            other => {
                return Err(anyhow!(
                    "task '{}': optimization must be a single-key object, got {other}",
                    task.label()
                ));
            }
        };

        let strategy = self.strategies.get(name).ok_or_else(|| {
            anyhow!(
                "task '{}': unknown optimization strategy '{name}'",
                task.label()
            )
        })?;

        if strategy.should_remove(task, arg)? {
            debug!(task = %task.label(), strategy = %name, "strategy allows removal");
            return Ok(Decision::Remove);
        }
        if let Some(replacement) = strategy.replacement(task, arg)? {
            debug!(
                task = %task.label(),
                strategy = %name,
                replacement = %replacement.label(),
                "replacing task"
            );
            return Ok(Decision::Replace(replacement));
        }
        Ok(Decision::Keep)
    }
}
