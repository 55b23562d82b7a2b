// src/task/taskgraph.rs

//! A set of tasks bound to the graph of their hard dependencies.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{Result, TaskgraphError};
use crate::graph::{Edge, Graph};
use crate::task::{Label, Task};

/// Tasks keyed by label, plus the graph derived from their `dependencies`.
///
/// Invariants, checked whenever a `TaskGraph` is built:
/// - the graph's node set equals the set of task labels;
/// - every `(name, target)` in a task's `dependencies` is an edge of the
///   graph and `target` is a task of this graph.
///
/// Tasks keep the order in which they were supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<Label, usize>,
    graph: Graph<Label>,
}

impl TaskGraph {
    /// Build a task graph, checking that every hard dependency points at a
    /// task of the same set.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self> {
        let tasks: Vec<Task> = tasks.into_iter().collect();
        let index = index_labels(&tasks)?;

        let mut edges = Vec::new();
        for task in &tasks {
            for (name, target) in task.dependencies() {
                if !index.contains_key(target) {
                    return Err(TaskgraphError::DanglingDependency {
                        label: task.label().to_string(),
                        dependency_name: name.clone(),
                        target: target.clone(),
                    });
                }
                edges.push(Edge::new(task.label().to_string(), target.clone(), name.clone()));
            }
        }

        let graph = Graph::new(index.keys().cloned(), edges)?;
        Ok(Self {
            tasks,
            index,
            graph,
        })
    }

    /// Restrict to `labels`.
    ///
    /// Fails if a label is unknown or if an included task has a hard
    /// dependency outside the subset. Soft and if dependencies pointing
    /// outside the subset are dropped from the included tasks.
    pub fn sub(&self, labels: &BTreeSet<Label>) -> Result<TaskGraph> {
        if let Some(missing) = labels.iter().find(|l| !self.index.contains_key(*l)) {
            return Err(TaskgraphError::TaskNotFound(missing.clone()));
        }

        let mut tasks = Vec::with_capacity(labels.len());
        for task in self.tasks.iter().filter(|t| labels.contains(t.label())) {
            if let Some((name, target)) = task
                .dependencies()
                .iter()
                .find(|(_, target)| !labels.contains(*target))
            {
                return Err(TaskgraphError::DanglingDependency {
                    label: task.label().to_string(),
                    dependency_name: name.clone(),
                    target: target.clone(),
                });
            }
            tasks.push(task.retain_ordering_hints(|l| labels.contains(l)));
        }

        Ok(Self::assemble(tasks, self.graph.subgraph(labels)))
    }

    /// Display-time restriction to `labels`: unknown labels are ignored and
    /// every reference to a task outside the subset is dropped.
    pub fn project(&self, labels: &BTreeSet<Label>) -> TaskGraph {
        let tasks = self
            .tasks
            .iter()
            .filter(|t| labels.contains(t.label()))
            .map(|t| t.retain_dependencies(|l| labels.contains(l)))
            .collect();
        Self::assemble(tasks, self.graph.subgraph(labels))
    }

    /// Display-time selection of `labels` in the given order. Unknown labels
    /// are ignored and references to unselected tasks are dropped.
    pub fn select(&self, labels: &[Label]) -> TaskGraph {
        let keep: BTreeSet<Label> = labels.iter().cloned().collect();
        let mut seen = BTreeSet::new();
        let tasks = labels
            .iter()
            .filter(|l| seen.insert(l.as_str()))
            .filter_map(|l| self.get(l))
            .map(|t| t.retain_dependencies(|l| keep.contains(l)))
            .collect();
        Self::assemble(tasks, self.graph.subgraph(&keep))
    }

    /// Replace every task through `f`, keeping the graph as is.
    ///
    /// `f` must preserve labels. Used for display projections where the graph
    /// remains authoritative for dependencies.
    pub(crate) fn map_tasks<F>(&self, mut f: F) -> Result<TaskGraph>
    where
        F: FnMut(&Task) -> Result<Task>,
    {
        let mut tasks = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let mapped = f(task)?;
            if mapped.label() != task.label() {
                return Err(TaskgraphError::InvalidTask(format!(
                    "task '{}' was relabeled to '{}' during projection",
                    task.label(),
                    mapped.label()
                )));
            }
            tasks.push(mapped);
        }
        Ok(Self::assemble(tasks, self.graph.clone()))
    }

    fn assemble(tasks: Vec<Task>, graph: Graph<Label>) -> Self {
        let index = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.label().to_string(), i))
            .collect();
        Self {
            tasks,
            index,
            graph,
        }
    }

    pub fn graph(&self) -> &Graph<Label> {
        &self.graph
    }

    pub fn get(&self, label: &str) -> Option<&Task> {
        self.index.get(label).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.label())
    }

    pub fn label_set(&self) -> BTreeSet<Label> {
        self.index.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Serialize as `label -> task`, taking each task's `dependencies` from
    /// the graph edges.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.tasks
                .iter()
                .map(|t| (t.label().to_string(), self.task_json(t)))
                .collect(),
        )
    }

    /// Inverse of [`TaskGraph::to_json`].
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    fn task_json(&self, task: &Task) -> Value {
        let mut json = task.to_json();
        let label = task.label().to_string();
        let dependencies: Map<String, Value> = self
            .graph
            .named_edges_from(&label)
            .into_iter()
            .map(|(name, target)| (name.to_string(), Value::String(target.clone())))
            .collect();
        if let Value::Object(ref mut fields) = json {
            fields.insert("dependencies".to_string(), Value::Object(dependencies));
        }
        json
    }
}

fn index_labels(tasks: &[Task]) -> Result<HashMap<Label, usize>> {
    let mut index = HashMap::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        if index.insert(task.label().to_string(), i).is_some() {
            return Err(TaskgraphError::DuplicateLabel(task.label().to_string()));
        }
    }
    Ok(index)
}

/// Serializes in insertion order, same as [`TaskGraph::to_json`].
impl Serialize for TaskGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tasks.len()))?;
        for task in &self.tasks {
            map.serialize_entry(task.label(), &self.task_json(task))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TaskGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(TaskGraphVisitor)
    }
}

struct TaskGraphVisitor;

impl<'de> Visitor<'de> for TaskGraphVisitor {
    type Value = TaskGraph;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping from task label to task")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<TaskGraph, A::Error> {
        let mut tasks = Vec::new();
        while let Some((label, task)) = access.next_entry::<String, Task>()? {
            if label != task.label() {
                return Err(de::Error::custom(format!(
                    "task keyed '{label}' is labeled '{}'",
                    task.label()
                )));
            }
            tasks.push(task);
        }
        TaskGraph::from_tasks(tasks).map_err(de::Error::custom)
    }
}
