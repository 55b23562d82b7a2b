// src/task/mod.rs

//! Tasks and the task graph built from them.
//!
//! - [`Task`] is a single unit of work: metadata, named dependencies and an
//!   opaque payload.
//! - [`taskgraph`] binds a set of tasks to a [`crate::graph::Graph`] derived
//!   from their dependencies.

pub mod taskgraph;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::errors::TaskgraphError;

pub use taskgraph::TaskGraph;

/// Label of a task, unique within one [`TaskGraph`].
pub type Label = String;

/// A unit of work.
///
/// A `Task` is never changed once it is part of a graph; pipeline stages that
/// need a different task build a new value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "TaskJson")]
pub struct Task {
    kind: String,
    label: Label,
    description: String,
    attributes: Map<String, Value>,
    payload: Value,
    dependencies: BTreeMap<String, Label>,
    soft_dependencies: Vec<Label>,
    if_dependencies: Vec<Label>,
    optimization: Option<Value>,
}

impl Task {
    /// New task with an empty description, no dependencies and a `null`
    /// payload. `attributes["kind"]` is set to `kind`.
    pub fn new(kind: impl Into<String>, label: impl Into<Label>) -> Self {
        let kind = kind.into();
        let mut attributes = Map::new();
        attributes.insert("kind".to_string(), Value::String(kind.clone()));
        Self {
            kind,
            label: label.into(),
            description: String::new(),
            attributes,
            payload: Value::Null,
            dependencies: BTreeMap::new(),
            soft_dependencies: Vec::new(),
            if_dependencies: Vec::new(),
            optimization: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the attributes. `kind` is re-injected.
    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self.attributes
            .insert("kind".to_string(), Value::String(self.kind.clone()));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != "kind" {
            self.attributes.insert(key, value);
        }
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, target: impl Into<Label>) -> Self {
        self.dependencies.insert(name.into(), target.into());
        self
    }

    pub fn with_dependencies(mut self, dependencies: BTreeMap<String, Label>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_soft_dependencies(mut self, labels: Vec<Label>) -> Self {
        self.soft_dependencies = labels;
        self
    }

    pub fn with_if_dependencies(mut self, labels: Vec<Label>) -> Self {
        self.if_dependencies = labels;
        self
    }

    pub fn with_optimization(mut self, optimization: Option<Value>) -> Self {
        self.optimization = optimization;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The execution payload. Never interpreted by this crate.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Hard dependencies: `dependency name -> label`.
    pub fn dependencies(&self) -> &BTreeMap<String, Label> {
        &self.dependencies
    }

    pub fn soft_dependencies(&self) -> &[Label] {
        &self.soft_dependencies
    }

    pub fn if_dependencies(&self) -> &[Label] {
        &self.if_dependencies
    }

    pub fn optimization(&self) -> Option<&Value> {
        self.optimization.as_ref()
    }

    /// Serialized form of this task.
    pub fn to_json(&self) -> Value {
        json!({
            "kind": self.kind,
            "label": self.label,
            "description": self.description,
            "attributes": self.attributes,
            "dependencies": self.dependencies,
            "soft_dependencies": self.soft_dependencies,
            "if_dependencies": self.if_dependencies,
            "optimization": self.optimization,
            "task": self.payload,
        })
    }

    /// Rebuild a task from its serialized form.
    pub fn from_json(value: Value) -> crate::errors::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Copy of this task whose label references are mapped through `rewrite`.
    ///
    /// Hard dependencies map to `Some(new_label)` or are kept unchanged on
    /// `None`. Soft and if dependencies mapping to `None` are dropped.
    pub(crate) fn relabeled<F>(&self, rewrite: F) -> Task
    where
        F: Fn(&str) -> Option<Option<Label>>,
    {
        let mut task = self.clone();
        task.dependencies = self
            .dependencies
            .iter()
            .map(|(name, target)| {
                let target = match rewrite(target) {
                    Some(Some(new)) => new,
                    _ => target.clone(),
                };
                (name.clone(), target)
            })
            .collect();
        let keep = |labels: &[Label]| -> Vec<Label> {
            labels
                .iter()
                .filter_map(|l| match rewrite(l) {
                    None => Some(l.clone()),
                    Some(mapped) => mapped,
                })
                .collect()
        };
        task.soft_dependencies = keep(&self.soft_dependencies);
        task.if_dependencies = keep(&self.if_dependencies);
        task
    }

    /// Copy of this task with soft and if dependencies outside `present`
    /// dropped.
    pub(crate) fn retain_ordering_hints<P>(&self, present: P) -> Task
    where
        P: Fn(&str) -> bool,
    {
        let mut task = self.clone();
        task.soft_dependencies.retain(|l| present(l));
        task.if_dependencies.retain(|l| present(l));
        task
    }

    /// Copy of this task with hard dependencies outside `present` dropped.
    pub(crate) fn retain_dependencies<P>(&self, present: P) -> Task
    where
        P: Fn(&str) -> bool,
    {
        let mut task = self.retain_ordering_hints(&present);
        task.dependencies.retain(|_, target| present(target));
        task
    }
}

/// Wire form of a [`Task`]; every field except `kind` and `label` is optional.
#[derive(Debug, Deserialize)]
struct TaskJson {
    kind: String,
    label: Label,
    #[serde(default)]
    description: String,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    task: Value,
    #[serde(default)]
    dependencies: BTreeMap<String, Label>,
    #[serde(default)]
    soft_dependencies: Vec<Label>,
    #[serde(default)]
    if_dependencies: Vec<Label>,
    #[serde(default)]
    optimization: Option<Value>,
}

impl TryFrom<TaskJson> for Task {
    type Error = TaskgraphError;

    fn try_from(raw: TaskJson) -> Result<Self, Self::Error> {
        if raw.label.is_empty() {
            return Err(TaskgraphError::InvalidTask(
                "task label must not be empty".to_string(),
            ));
        }
        if raw.kind.is_empty() {
            return Err(TaskgraphError::InvalidTask(format!(
                "task '{}' has an empty kind",
                raw.label
            )));
        }

        Ok(Task::new(raw.kind, raw.label)
            .with_description(raw.description)
            .with_attributes(raw.attributes)
            .with_payload(raw.task)
            .with_dependencies(raw.dependencies)
            .with_soft_dependencies(raw.soft_dependencies)
            .with_if_dependencies(raw.if_dependencies)
            .with_optimization(raw.optimization))
    }
}
