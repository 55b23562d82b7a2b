use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use taskgraph::generator::{
    Decision, MorphPass, OptimizeContext, Optimizer, TargetResolver, TaskLoader,
};
use taskgraph::task::{Label, Task, TaskGraph};

/// A loader that hands out a fixed task list and counts how often it was
/// asked.
pub struct CountingLoader {
    tasks: Vec<Task>,
    calls: Arc<AtomicUsize>,
}

impl CountingLoader {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle on the call counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl TaskLoader for CountingLoader {
    fn name(&self) -> &str {
        "counting-loader"
    }

    fn load_tasks(&self) -> Result<Vec<Task>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tasks.clone())
    }
}

/// A resolver returning a fixed seed list.
pub struct StaticTargets {
    labels: Vec<Label>,
}

impl StaticTargets {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl TargetResolver for StaticTargets {
    fn name(&self) -> &str {
        "static-targets"
    }

    fn target_tasks(&self, _full: &TaskGraph) -> Result<Vec<Label>> {
        Ok(self.labels.clone())
    }
}

/// An optimizer answering from a fixed table (default `Keep`) and recording
/// the order in which it was consulted, with the dependents it was shown.
pub struct ScriptedOptimizer {
    decisions: HashMap<Label, Decision>,
    seen: Arc<Mutex<Vec<(Label, Vec<Label>)>>>,
}

impl ScriptedOptimizer {
    pub fn new() -> Self {
        Self {
            decisions: HashMap::new(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn remove(mut self, label: &str) -> Self {
        self.decisions.insert(label.to_string(), Decision::Remove);
        self
    }

    pub fn replace(mut self, label: &str, with: Task) -> Self {
        self.decisions
            .insert(label.to_string(), Decision::Replace(with));
        self
    }

    /// Shared log of `(task, dependents)` per consultation.
    pub fn seen(&self) -> Arc<Mutex<Vec<(Label, Vec<Label>)>>> {
        Arc::clone(&self.seen)
    }
}

impl Default for ScriptedOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer for ScriptedOptimizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn decide(&self, task: &Task, ctx: &OptimizeContext<'_>) -> Result<Decision> {
        let dependents = ctx
            .dependents
            .iter()
            .map(|(label, _)| label.to_string())
            .collect();
        self.seen
            .lock()
            .unwrap()
            .push((task.label().to_string(), dependents));
        Ok(self
            .decisions
            .get(task.label())
            .cloned()
            .unwrap_or(Decision::Keep))
    }
}

/// A morph pass backed by a closure.
pub struct FnMorph<F> {
    name: String,
    f: F,
}

impl<F> FnMorph<F>
where
    F: Fn(&TaskGraph) -> Result<Vec<Task>>,
{
    pub fn new(name: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> MorphPass for FnMorph<F>
where
    F: Fn(&TaskGraph) -> Result<Vec<Task>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, graph: &TaskGraph) -> Result<Vec<Task>> {
        (self.f)(graph)
    }
}
