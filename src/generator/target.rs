// src/generator/target.rs

//! Closure of the target task set.

use std::collections::BTreeSet;

use tracing::debug;

use crate::task::{Label, TaskGraph};

/// Attribute marking a task that joins every target closure it can.
pub const ALWAYS_TARGET_ATTRIBUTE: &str = "always_target";

/// Edge predicate selecting hard dependencies.
///
/// Task graph edges are only ever derived from `dependencies`, so every
/// edge qualifies.
pub fn hard_dependency(_edge_name: &str) -> bool {
    true
}

/// Labels of tasks flagged with `attributes.always_target = true`, in graph
/// order.
pub fn always_target_tasks(full: &TaskGraph) -> Vec<Label> {
    full.tasks()
        .filter(|t| {
            t.attribute(ALWAYS_TARGET_ATTRIBUTE)
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
        })
        .map(|t| t.label().to_string())
        .collect()
}

/// Compute the labels of the target task graph.
///
/// Starting from `seeds` and `extra_roots`, follow hard dependencies. Then
/// drop every non-seed task whose `if_dependencies` are non-empty and none of
/// them is reachable from the roots without going through the task itself,
/// together with the tasks that transitively require it, and recompute the
/// closure from the remaining roots. Repeat until nothing changes.
///
/// Seeds always survive: a conditional task whose removal would take a seed
/// with it stays in the closure.
pub fn target_closure(full: &TaskGraph, seeds: &[Label], extra_roots: &[Label]) -> BTreeSet<Label> {
    let graph = full.graph();
    let seed_set: BTreeSet<&str> = seeds.iter().map(String::as_str).collect();
    let roots: BTreeSet<Label> = seeds.iter().chain(extra_roots).cloned().collect();

    let mut included = graph.closure(roots.iter(), hard_dependency);
    let mut pinned: BTreeSet<Label> = BTreeSet::new();

    loop {
        let candidate = included.iter().find(|label| {
            !seed_set.contains(label.as_str())
                && !pinned.contains(*label)
                && if_dependencies_unsatisfied(full, label, &included, &roots)
        });
        let Some(candidate) = candidate.cloned() else {
            break;
        };

        let within = graph.subgraph(&included);
        let doomed = within.reverse_closure([&candidate], hard_dependency);

        if doomed.iter().any(|l| seed_set.contains(l.as_str())) {
            debug!(
                task = %candidate,
                "if_dependencies unsatisfied but required by a target task; keeping"
            );
            pinned.insert(candidate);
            continue;
        }

        debug!(
            task = %candidate,
            removed = doomed.len(),
            "if_dependencies unsatisfied; excluding task and its dependents"
        );
        let remaining: BTreeSet<Label> = included.difference(&doomed).cloned().collect();
        let within = graph.subgraph(&remaining);
        included = within.closure(roots.iter().filter(|r| remaining.contains(*r)), hard_dependency);
    }

    included
}

/// True when `label` has if-dependencies and none of them is reachable from
/// the roots without passing through `label` itself.
fn if_dependencies_unsatisfied(
    full: &TaskGraph,
    label: &str,
    included: &BTreeSet<Label>,
    roots: &BTreeSet<Label>,
) -> bool {
    let Some(task) = full.get(label) else {
        return false;
    };
    let conditions = task.if_dependencies();
    if conditions.is_empty() {
        return false;
    }

    let mut others = included.clone();
    others.remove(label);
    let reachable = full
        .graph()
        .subgraph(&others)
        .closure(roots.iter().filter(|r| others.contains(*r)), hard_dependency);
    !conditions.iter().any(|dep| reachable.contains(dep))
}
