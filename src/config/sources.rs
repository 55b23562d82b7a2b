// src/config/sources.rs

//! Task-file backed collaborators for the generator.

use anyhow::Result;
use tracing::debug;

use crate::config::model::{ConfigFile, Parameters};
use crate::generator::{TargetResolver, TaskLoader};
use crate::task::{Label, Task, TaskGraph};

impl TaskLoader for ConfigFile {
    fn name(&self) -> &str {
        "task-file"
    }

    fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.tasks().to_vec())
    }
}

/// Target selection driven by `[parameters]`.
///
/// - `target_tasks` if non-empty, in the given order;
/// - else every task whose kind is in `target_kinds`;
/// - else every task.
#[derive(Debug, Clone)]
pub struct ParameterTargets {
    parameters: Parameters,
}

impl ParameterTargets {
    pub fn new(parameters: Parameters) -> Self {
        Self { parameters }
    }
}

impl TargetResolver for ParameterTargets {
    fn name(&self) -> &str {
        "parameters"
    }

    fn target_tasks(&self, full: &TaskGraph) -> Result<Vec<Label>> {
        if !self.parameters.target_tasks.is_empty() {
            return Ok(self.parameters.target_tasks.clone());
        }

        let by_kind = !self.parameters.target_kinds.is_empty();
        let labels: Vec<Label> = full
            .tasks()
            .filter(|t| !by_kind || self.parameters.target_kinds.iter().any(|k| k == t.kind()))
            .map(|t| t.label().to_string())
            .collect();
        debug!(by_kind, targets = labels.len(), "resolved target tasks");
        Ok(labels)
    }
}
