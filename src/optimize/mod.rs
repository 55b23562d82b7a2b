// src/optimize/mod.rs

//! Optimization traversal.
//!
//! The [`Optimizer`] decides; this module owns the order in which tasks are
//! presented (dependents before dependencies) and the relabeling of every
//! surviving edge once decisions are known.
//!
//! - [`strategies`] provides a directive-driven [`Optimizer`].

pub mod strategies;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info};

use crate::errors::{Result, TaskgraphError};
use crate::generator::collaborators::{Decision, OptimizeContext, Optimizer};
use crate::task::{Label, TaskGraph};

pub use strategies::{Always, Never, OptimizationStrategy, StrategyOptimizer};

/// What happened to an original label during optimization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relabel {
    Removed,
    Replaced(Label),
}

/// Original label to its fate, for labels that did not survive unchanged.
pub type LabelMap = BTreeMap<Label, Relabel>;

/// Result of the optimization stage.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedGraph {
    pub graph: TaskGraph,
    /// Only labels that were removed or replaced appear here.
    pub label_map: LabelMap,
}

/// Optimize `graph`.
///
/// Labels in `do_not_optimize` are kept without consulting `optimizer`. A
/// removal is turned into a keep while any surviving dependent still points
/// at the task.
pub fn optimize_task_graph(
    graph: &TaskGraph,
    optimizer: &dyn Optimizer,
    do_not_optimize: &BTreeSet<Label>,
) -> Result<OptimizedGraph> {
    let order = graph.graph().reverse_topo_order()?;
    let mut decisions: HashMap<Label, Decision> = HashMap::with_capacity(order.len());

    for label in &order {
        let Some(task) = graph.get(label) else {
            return Err(TaskgraphError::TaskNotFound(label.clone()));
        };

        let decision = if do_not_optimize.contains(label) {
            debug!(task = %label, "optimization disabled for task");
            Decision::Keep
        } else {
            let ctx = OptimizeContext {
                graph,
                dependents: dependents_decisions(graph, label, &decisions),
            };
            let decision = optimizer
                .decide(task, &ctx)
                .map_err(|e| TaskgraphError::collaborator(optimizer.name(), e))?;
            enforce_dependents(graph, label, decision, &decisions)
        };

        decisions.insert(label.clone(), decision);
    }

    let label_map: LabelMap = decisions
        .iter()
        .filter_map(|(label, decision)| match decision {
            Decision::Keep => None,
            Decision::Remove => Some((label.clone(), Relabel::Removed)),
            Decision::Replace(task) => Some((
                label.clone(),
                Relabel::Replaced(task.label().to_string()),
            )),
        })
        .collect();

    let rewrite = |target: &str| -> Option<Option<Label>> {
        match label_map.get(target)? {
            Relabel::Removed => Some(None),
            Relabel::Replaced(new) => Some(Some(new.clone())),
        }
    };

    let mut tasks = Vec::with_capacity(graph.len());
    for task in graph.tasks() {
        match decisions.get(task.label()) {
            Some(Decision::Remove) => {}
            Some(Decision::Replace(replacement)) => tasks.push(replacement.relabeled(rewrite)),
            _ => tasks.push(task.relabeled(rewrite)),
        }
    }

    let optimized = TaskGraph::from_tasks(tasks)
        .map_err(|e| TaskgraphError::contract_violation(optimizer.name(), e))?;

    info!(
        before = graph.len(),
        after = optimized.len(),
        removed = label_map.values().filter(|r| **r == Relabel::Removed).count(),
        replaced = label_map.values().filter(|r| matches!(r, Relabel::Replaced(_))).count(),
        "optimized task graph"
    );

    Ok(OptimizedGraph {
        graph: optimized,
        label_map,
    })
}

fn dependents_decisions<'a>(
    graph: &'a TaskGraph,
    label: &Label,
    decisions: &'a HashMap<Label, Decision>,
) -> Vec<(&'a str, &'a Decision)> {
    graph
        .graph()
        .dependents_of(label)
        .into_iter()
        .filter_map(|dependent| {
            decisions
                .get(dependent)
                .map(|decision| (dependent.as_str(), decision))
        })
        .collect()
}

/// A task may only be removed once nothing that survives still needs it.
fn enforce_dependents(
    graph: &TaskGraph,
    label: &Label,
    decision: Decision,
    decisions: &HashMap<Label, Decision>,
) -> Decision {
    if decision != Decision::Remove {
        return decision;
    }

    let blocker = graph.graph().dependents_of(label).into_iter().find(|dependent| {
        match decisions.get(*dependent) {
            Some(Decision::Remove) => false,
            Some(Decision::Replace(replacement)) => {
                replacement.dependencies().values().any(|t| t == label)
            }
            _ => true,
        }
    });

    match blocker {
        Some(dependent) => {
            debug!(
                task = %label,
                %dependent,
                "not removing task still required by a dependent"
            );
            Decision::Keep
        }
        None => {
            debug!(task = %label, "removing task");
            Decision::Remove
        }
    }
}
