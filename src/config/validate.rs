// src/config/validate.rs

use std::collections::BTreeSet;

use crate::config::model::{ConfigFile, Parameters, RawConfigFile};
use crate::errors::{Result, TaskgraphError};
use crate::task::Task;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let tasks: Vec<Task> = raw
            .task
            .iter()
            .map(|(label, cfg)| -> Result<Task> {
                validate_task_config(label, &cfg.kind, &cfg.attributes)?;
                Ok(cfg.to_task(label))
            })
            .collect::<Result<_>>()?;

        validate_config(&raw.parameters, &tasks)?;
        Ok(ConfigFile::new_unchecked(raw.parameters, tasks))
    }
}

/// Semantic checks shared by every task source.
///
/// This checks:
/// - there is at least one task
/// - parameter labels and kinds refer to existing tasks
///
/// Dependency targets are checked when the full task graph is built.
pub fn validate_config(parameters: &Parameters, tasks: &[Task]) -> Result<()> {
    ensure_has_tasks(tasks)?;
    validate_parameters(parameters, tasks)?;
    Ok(())
}

fn ensure_has_tasks(tasks: &[Task]) -> Result<()> {
    if tasks.is_empty() {
        return Err(TaskgraphError::Config(
            "task file must contain at least one [task.<label>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_config(
    label: &str,
    kind: &str,
    attributes: &serde_json::Map<String, serde_json::Value>,
) -> Result<()> {
    if label.trim().is_empty() {
        return Err(TaskgraphError::Config(
            "task labels must not be empty".to_string(),
        ));
    }
    if kind.trim().is_empty() {
        return Err(TaskgraphError::Config(format!(
            "task '{label}' must have a non-empty `kind`"
        )));
    }
    if let Some(attr_kind) = attributes.get("kind") {
        if attr_kind.as_str() != Some(kind) {
            return Err(TaskgraphError::Config(format!(
                "task '{label}' sets attributes.kind = {attr_kind}, which disagrees with kind '{kind}'"
            )));
        }
    }
    Ok(())
}

fn validate_parameters(parameters: &Parameters, tasks: &[Task]) -> Result<()> {
    let labels: BTreeSet<&str> = tasks.iter().map(|t| t.label()).collect();
    let kinds: BTreeSet<&str> = tasks.iter().map(|t| t.kind()).collect();

    for label in &parameters.target_tasks {
        if !labels.contains(label.as_str()) {
            return Err(TaskgraphError::Config(format!(
                "[parameters].target_tasks names unknown task '{label}'"
            )));
        }
    }
    for label in &parameters.do_not_optimize {
        if !labels.contains(label.as_str()) {
            return Err(TaskgraphError::Config(format!(
                "[parameters].do_not_optimize names unknown task '{label}'"
            )));
        }
    }
    for kind in &parameters.target_kinds {
        if !kinds.contains(kind.as_str()) {
            return Err(TaskgraphError::Config(format!(
                "[parameters].target_kinds names kind '{kind}' that no task has"
            )));
        }
    }
    Ok(())
}
