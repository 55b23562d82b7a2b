// src/filter.rs

//! Label/key filtering of a task graph for display.
//!
//! Filtering is a projection, not a pipeline stage: dependencies on tasks that
//! were filtered out are dropped rather than reported.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::debug;

use crate::errors::Result;
use crate::task::{Label, Task, TaskGraph};
use crate::value::remove_path;

/// Compile a label pattern with match-at-start semantics.
///
/// The pattern must match from the first character of the label; it only has
/// to consume the whole label if it ends with `$` itself.
pub fn compile_label_regex(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})"))?)
}

/// Filter `graph` by label and prune keys from every task.
///
/// - `label_regex`: keep only tasks whose label matches (see
///   [`compile_label_regex`]).
/// - `exclude_paths`: dot-paths (e.g. `attributes.thing`) removed from the
///   serialized form of every task where present.
///
/// The result keeps the input's task order.
pub fn filter(
    graph: &TaskGraph,
    label_regex: Option<&str>,
    exclude_paths: Option<&[String]>,
) -> Result<TaskGraph> {
    let mut filtered = match label_regex {
        Some(pattern) => {
            let regex = compile_label_regex(pattern)?;
            let keep: BTreeSet<Label> = graph
                .labels()
                .filter(|l| regex.is_match(l))
                .map(str::to_string)
                .collect();
            debug!(
                pattern,
                kept = keep.len(),
                total = graph.len(),
                "filtered tasks by label"
            );
            graph.project(&keep)
        }
        None => graph.clone(),
    };

    if let Some(paths) = exclude_paths.filter(|p| !p.is_empty()) {
        filtered = filtered.map_tasks(|task| exclude_keys(task, paths))?;
    }

    Ok(filtered)
}

fn exclude_keys(task: &Task, paths: &[String]) -> Result<Task> {
    let mut json = task.to_json();
    for path in paths {
        if remove_path(&mut json, path).is_some() {
            debug!(task = %task.label(), %path, "excluded key");
        }
    }
    Task::from_json(json)
}
