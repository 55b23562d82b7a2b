// src/config/model.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::generator::GeneratorOptions;
use crate::task::{Label, Task};

/// Task file as read from TOML, before validation.
///
/// ```toml
/// [parameters]
/// target_tasks = ["build-linux"]
///
/// [task.toolchain-linux]
/// kind = "toolchain"
///
/// [task.build-linux]
/// kind = "build"
/// dependencies = { toolchain = "toolchain-linux" }
/// task = { command = "make" }
/// ```
///
/// Tasks are keyed by label and keep the order of the file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default)]
    pub task: TaskTable,
}

/// The `[task.*]` tables in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskTable(Vec<(Label, TaskConfig)>);

impl TaskTable {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskConfig)> {
        self.0.iter().map(|(label, cfg)| (label.as_str(), cfg))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for TaskTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TaskTableVisitor)
    }
}

struct TaskTableVisitor;

impl<'de> Visitor<'de> for TaskTableVisitor {
    type Value = TaskTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a table of tasks keyed by label")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TaskTable, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry::<Label, TaskConfig>()? {
            entries.push(entry);
        }
        Ok(TaskTable(entries))
    }
}

/// `[parameters]` section.
///
/// Controls target selection and optimization; every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Explicit seed labels, in seed order.
    pub target_tasks: Vec<Label>,

    /// Kinds whose tasks form the seed when `target_tasks` is empty.
    pub target_kinds: Vec<String>,

    /// When `false`, target tasks are exempt from optimization.
    pub optimize_target_tasks: bool,

    /// Labels exempt from optimization.
    pub do_not_optimize: Vec<Label>,

    /// Whether tasks with `attributes.always_target = true` join the target
    /// closure.
    pub enable_always_target: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            target_tasks: Vec::new(),
            target_kinds: Vec::new(),
            optimize_target_tasks: true,
            do_not_optimize: Vec::new(),
            enable_always_target: false,
        }
    }
}

impl Parameters {
    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            optimize_target_tasks: self.optimize_target_tasks,
            do_not_optimize: self.do_not_optimize.iter().cloned().collect::<BTreeSet<_>>(),
            enable_always_target: self.enable_always_target,
        }
    }
}

/// `[task.<label>]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub kind: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,

    /// Execution payload, passed through untouched.
    #[serde(default)]
    pub task: Value,

    /// `name = "label"` pairs.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Label>,

    #[serde(default)]
    pub soft_dependencies: Vec<Label>,

    #[serde(default)]
    pub if_dependencies: Vec<Label>,

    /// Optimization directive, e.g. `{ always = true }`.
    #[serde(default)]
    pub optimization: Option<Value>,
}

impl TaskConfig {
    pub fn to_task(&self, label: &str) -> Task {
        Task::new(self.kind.clone(), label)
            .with_description(self.description.clone())
            .with_attributes(self.attributes.clone())
            .with_payload(self.task.clone())
            .with_dependencies(self.dependencies.clone())
            .with_soft_dependencies(self.soft_dependencies.clone())
            .with_if_dependencies(self.if_dependencies.clone())
            .with_optimization(self.optimization.clone())
    }
}

/// A validated task file: parameters plus the tasks it defines.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub parameters: Parameters,
    tasks: Vec<Task>,
}

impl ConfigFile {
    /// Callers are responsible for validation; see `TryFrom<RawConfigFile>`.
    pub(crate) fn new_unchecked(parameters: Parameters, tasks: Vec<Task>) -> Self {
        Self { parameters, tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }
}
