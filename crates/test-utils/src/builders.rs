#![allow(dead_code)]

use serde_json::{Map, Value};
use taskgraph::config::Parameters;
use taskgraph::generator::{Generator, GeneratorOptions};
use taskgraph::task::{Task, TaskGraph};

use crate::fakes::{CountingLoader, StaticTargets};

/// Builder for `Task` to simplify test setup.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    /// A task of kind `"task"`.
    pub fn new(label: &str) -> Self {
        Self {
            task: Task::new("task", label),
        }
    }

    pub fn kind(mut self, kind: &str) -> Self {
        let label = self.task.label().to_string();
        let attributes: Map<String, Value> = self.task.attributes().clone();
        self.task = Task::new(kind, label)
            .with_description(self.task.description().to_string())
            .with_attributes(attributes)
            .with_payload(self.task.payload().clone())
            .with_dependencies(self.task.dependencies().clone())
            .with_soft_dependencies(self.task.soft_dependencies().to_vec())
            .with_if_dependencies(self.task.if_dependencies().to_vec())
            .with_optimization(self.task.optimization().cloned());
        self
    }

    pub fn dep(mut self, name: &str, target: &str) -> Self {
        self.task = self.task.with_dependency(name, target);
        self
    }

    /// Hard dependency named after its target.
    pub fn after(self, target: &str) -> Self {
        self.dep(target, target)
    }

    pub fn soft(mut self, target: &str) -> Self {
        let mut soft = self.task.soft_dependencies().to_vec();
        soft.push(target.to_string());
        self.task = self.task.with_soft_dependencies(soft);
        self
    }

    pub fn if_dep(mut self, target: &str) -> Self {
        let mut conditions = self.task.if_dependencies().to_vec();
        conditions.push(target.to_string());
        self.task = self.task.with_if_dependencies(conditions);
        self
    }

    pub fn attr(mut self, key: &str, value: Value) -> Self {
        self.task = self.task.with_attribute(key, value);
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.task = self.task.with_payload(payload);
        self
    }

    pub fn optimization(mut self, directive: Value) -> Self {
        self.task = self.task.with_optimization(Some(directive));
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Build a task graph from builders, panicking on invalid input.
pub fn graph_of(tasks: Vec<TaskBuilder>) -> TaskGraph {
    TaskGraph::from_tasks(tasks.into_iter().map(TaskBuilder::build))
        .expect("Failed to build valid task graph from builders")
}

/// The three fake tasks `_fake-t-0`, `_fake-t-1`, `_fake-t-2`.
pub fn fake_tasks() -> Vec<Task> {
    (0..3)
        .map(|i| TaskBuilder::new(&format!("_fake-t-{i}")).kind("fake").build())
        .collect()
}

/// Generator over `tasks` with a fixed target seed.
pub fn make_generator(tasks: Vec<Task>, targets: &[&str]) -> Generator {
    make_generator_with_options(tasks, targets, GeneratorOptions::default())
}

pub fn make_generator_with_options(
    tasks: Vec<Task>,
    targets: &[&str],
    options: GeneratorOptions,
) -> Generator {
    Generator::new(CountingLoader::new(tasks), StaticTargets::new(targets)).with_options(options)
}

/// Parameters with an explicit target list.
pub fn parameters_with_targets(targets: &[&str]) -> Parameters {
    Parameters {
        target_tasks: targets.iter().map(|t| t.to_string()).collect(),
        ..Parameters::default()
    }
}
