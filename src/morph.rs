// src/morph.rs

//! Application of morph passes.

use tracing::{debug, info};

use crate::errors::{Result, TaskgraphError};
use crate::generator::collaborators::MorphPass;
use crate::task::TaskGraph;

/// Apply `passes` in order, rebuilding (and so re-validating) the task graph
/// after each one.
///
/// A pass producing tasks that do not form a valid task graph is reported as
/// a [`TaskgraphError::CollaboratorContract`] naming the pass.
pub fn apply_morphs(graph: &TaskGraph, passes: &[Box<dyn MorphPass>]) -> Result<TaskGraph> {
    let mut current = graph.clone();

    for pass in passes {
        let tasks = pass
            .apply(&current)
            .map_err(|e| TaskgraphError::collaborator(pass.name(), e))?;
        let before = current.len();
        current = TaskGraph::from_tasks(tasks)
            .map_err(|e| TaskgraphError::contract_violation(pass.name(), e))?;
        debug!(
            pass = pass.name(),
            before,
            after = current.len(),
            "applied morph pass"
        );
    }

    info!(passes = passes.len(), tasks = current.len(), "morphed task graph");
    Ok(current)
}
