// tests/generator_pipeline.rs

use std::collections::BTreeSet;
use std::error::Error;
use std::rc::Rc;
use std::sync::atomic::Ordering;

use anyhow::{anyhow, bail};
use taskgraph::errors::TaskgraphError;
use taskgraph::generator::{Generator, GeneratorOptions, Stage, TargetResolver};
use taskgraph::optimize::Relabel;
use taskgraph::task::{Label, Task, TaskGraph};
use taskgraph_test_utils::builders::{
    TaskBuilder, fake_tasks, make_generator, make_generator_with_options,
};
use taskgraph_test_utils::fakes::{CountingLoader, FnMorph, ScriptedOptimizer, StaticTargets};
use taskgraph_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn labels(graph: &TaskGraph) -> Vec<&str> {
    graph.labels().collect()
}

/// a -> b -> c, d standalone.
fn chain() -> Vec<Task> {
    vec![
        TaskBuilder::new("a").after("b").build(),
        TaskBuilder::new("b").after("c").build(),
        TaskBuilder::new("c").build(),
        TaskBuilder::new("d").build(),
    ]
}

fn label_set(labels: &[&str]) -> BTreeSet<Label> {
    labels.iter().map(|l| l.to_string()).collect()
}

struct FailingResolver;

impl TargetResolver for FailingResolver {
    fn name(&self) -> &str {
        "failing"
    }

    fn target_tasks(&self, _full: &TaskGraph) -> anyhow::Result<Vec<Label>> {
        Err(anyhow!("no parameters"))
    }
}

#[test]
fn test_stages_are_computed_once() -> TestResult {
    init_tracing();
    let loader = CountingLoader::new(fake_tasks());
    let calls = loader.calls();
    let mut generator =
        Generator::new(loader, StaticTargets::new(&["_fake-t-0", "_fake-t-1"]));

    let morphed = generator.morphed_task_graph()?;
    let full = generator.full_task_graph()?;
    let full_again = generator.full_task_graph()?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(Rc::ptr_eq(&full, &full_again));
    assert!(Rc::ptr_eq(&morphed, &generator.morphed_task_graph()?));
    assert!(Rc::ptr_eq(
        &generator.target_task_set()?,
        &generator.target_task_set()?
    ));
    Ok(())
}

#[test]
fn test_stages_are_computed_lazily_and_in_order() -> TestResult {
    let mut generator = make_generator(fake_tasks(), &["_fake-t-0"]);
    assert!(generator.computed_stages().is_empty());

    generator.target_task_graph()?;
    assert_eq!(
        generator.computed_stages(),
        vec![
            Stage::FullTaskGraph,
            Stage::TargetTaskSet,
            Stage::TargetTaskGraph
        ]
    );

    generator.label_map()?;
    assert_eq!(generator.computed_stages().len(), 4);
    Ok(())
}

#[test]
fn test_stage_names() {
    let names: Vec<String> = Stage::ALL.iter().map(|s| s.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "full_task_graph",
            "target_task_set",
            "target_task_graph",
            "optimized_task_graph",
            "morphed_task_graph"
        ]
    );
}

#[test]
fn test_full_task_graph_keeps_loader_order() -> TestResult {
    let mut generator = make_generator(chain(), &["a"]);
    assert_eq!(labels(&*generator.full_task_graph()?), vec!["a", "b", "c", "d"]);
    Ok(())
}

#[test]
fn test_full_task_graph_rejects_dangling_dependencies() {
    let tasks = vec![TaskBuilder::new("a").after("ghost").build()];
    let mut generator = make_generator(tasks, &["a"]);
    assert!(matches!(
        generator.full_task_graph(),
        Err(TaskgraphError::DanglingDependency { .. })
    ));
}

#[test]
fn test_target_task_set_is_deduplicated_in_seed_order() -> TestResult {
    let mut generator = make_generator(chain(), &["d", "a", "d"]);
    let seeds = generator.target_task_set()?;
    assert_eq!(*seeds, vec!["d".to_string(), "a".to_string()]);
    Ok(())
}

#[test]
fn test_unknown_target_label_is_an_error() {
    let mut generator = make_generator(chain(), &["a", "nope"]);
    assert!(matches!(
        generator.target_task_set(),
        Err(TaskgraphError::TaskNotFound(l)) if l == "nope"
    ));
}

#[test]
fn test_resolver_failure_names_the_resolver() {
    let mut generator = Generator::new(CountingLoader::new(chain()), FailingResolver);
    match generator.target_task_graph() {
        Err(TaskgraphError::Collaborator { collaborator, source }) => {
            assert_eq!(collaborator, "failing");
            assert!(source.to_string().contains("no parameters"));
        }
        other => panic!("expected collaborator error, got {other:?}"),
    }
}

#[test]
fn test_target_graph_is_the_dependency_closure() -> TestResult {
    let mut generator = make_generator(chain(), &["b"]);
    let target = generator.target_task_graph()?;
    assert_eq!(labels(&target), vec!["b", "c"]);
    assert_eq!(target.graph().edges().len(), 1);
    Ok(())
}

#[test]
fn test_if_dependencies_gate_always_target_tasks() -> TestResult {
    let tasks = vec![
        TaskBuilder::new("build").build(),
        TaskBuilder::new("lint")
            .if_dep("build")
            .attr("always_target", serde_json::json!(true))
            .build(),
        TaskBuilder::new("docs")
            .if_dep("publish")
            .attr("always_target", serde_json::json!(true))
            .build(),
        TaskBuilder::new("publish").build(),
    ];
    let options = GeneratorOptions {
        enable_always_target: true,
        ..GeneratorOptions::default()
    };
    let mut generator = make_generator_with_options(tasks, &["build"], options);

    assert_eq!(labels(&*generator.target_task_graph()?), vec!["build", "lint"]);
    Ok(())
}

#[test]
fn test_always_target_is_ignored_unless_enabled() -> TestResult {
    let tasks = vec![
        TaskBuilder::new("build").build(),
        TaskBuilder::new("lint")
            .attr("always_target", serde_json::json!(true))
            .build(),
    ];
    let mut generator = make_generator(tasks, &["build"]);
    assert_eq!(labels(&*generator.target_task_graph()?), vec!["build"]);
    Ok(())
}

#[test]
fn test_unsatisfied_if_dependency_excludes_dependents_too() -> TestResult {
    let tasks = vec![
        TaskBuilder::new("a").build(),
        TaskBuilder::new("wrapper")
            .after("cond")
            .attr("always_target", serde_json::json!(true))
            .build(),
        TaskBuilder::new("cond").if_dep("missing").build(),
    ];
    let options = GeneratorOptions {
        enable_always_target: true,
        ..GeneratorOptions::default()
    };
    let mut generator = make_generator_with_options(tasks, &["a"], options);

    assert_eq!(labels(&*generator.target_task_graph()?), vec!["a"]);
    Ok(())
}

#[test]
fn test_targets_keep_their_conditional_dependencies() -> TestResult {
    let tasks = vec![
        TaskBuilder::new("a").after("helper").build(),
        TaskBuilder::new("helper").if_dep("missing").build(),
    ];
    let mut generator = make_generator(tasks, &["a"]);
    assert_eq!(labels(&*generator.target_task_graph()?), vec!["a", "helper"]);
    Ok(())
}

#[test]
fn test_seeds_with_unsatisfied_if_dependencies_are_kept() -> TestResult {
    let tasks = vec![TaskBuilder::new("a").if_dep("elsewhere").build()];
    let mut generator = make_generator(tasks, &["a"]);
    assert_eq!(labels(&*generator.target_task_graph()?), vec!["a"]);
    Ok(())
}

#[test]
fn test_if_dependency_pulled_in_only_by_the_task_itself_does_not_count() -> TestResult {
    let tasks = vec![
        TaskBuilder::new("other").build(),
        TaskBuilder::new("build").build(),
        TaskBuilder::new("lint")
            .after("build")
            .if_dep("build")
            .attr("always_target", serde_json::json!(true))
            .build(),
    ];
    let options = GeneratorOptions {
        enable_always_target: true,
        ..GeneratorOptions::default()
    };
    let mut generator = make_generator_with_options(tasks, &["other"], options);

    assert_eq!(labels(&*generator.target_task_graph()?), vec!["other"]);
    Ok(())
}

#[test]
fn test_if_dependency_shared_with_a_target_counts() -> TestResult {
    let tasks = vec![
        TaskBuilder::new("test").after("build").build(),
        TaskBuilder::new("build").build(),
        TaskBuilder::new("lint")
            .after("build")
            .if_dep("build")
            .attr("always_target", serde_json::json!(true))
            .build(),
    ];
    let options = GeneratorOptions {
        enable_always_target: true,
        ..GeneratorOptions::default()
    };
    let mut generator = make_generator_with_options(tasks, &["test"], options);

    assert_eq!(labels(&*generator.target_task_graph()?), vec!["test", "build", "lint"]);
    Ok(())
}

#[test]
fn test_optimizer_sees_dependents_before_dependencies() -> TestResult {
    let optimizer = ScriptedOptimizer::new();
    let seen = optimizer.seen();
    let mut generator = make_generator(chain(), &["a"]).with_optimizer(optimizer);

    generator.optimized_task_graph()?;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ("a".to_string(), vec![]),
            ("b".to_string(), vec!["a".to_string()]),
            ("c".to_string(), vec!["b".to_string()]),
        ]
    );
    Ok(())
}

#[test]
fn test_removal_is_refused_while_a_dependent_survives() -> TestResult {
    let optimizer = ScriptedOptimizer::new().remove("b");
    let mut generator = make_generator(chain(), &["a"]).with_optimizer(optimizer);

    assert_eq!(labels(&*generator.optimized_task_graph()?), vec!["a", "b", "c"]);
    assert!(generator.label_map()?.is_empty());
    Ok(())
}

#[test]
fn test_removals_propagate_down_the_chain() -> TestResult {
    let optimizer = ScriptedOptimizer::new().remove("a").remove("b");
    let mut generator = make_generator(chain(), &["a"]).with_optimizer(optimizer);

    let optimized = generator.optimized_task_graph()?;
    assert_eq!(labels(&optimized), vec!["c"]);

    let label_map = generator.label_map()?;
    assert_eq!(label_map.get("a"), Some(&Relabel::Removed));
    assert_eq!(label_map.get("b"), Some(&Relabel::Removed));
    assert_eq!(label_map.len(), 2);
    Ok(())
}

#[test]
fn test_replacement_relabels_dependents() -> TestResult {
    let cached = Task::new("cached", "b-cached");
    let optimizer = ScriptedOptimizer::new().replace("b", cached);
    let mut generator = make_generator(chain(), &["a"]).with_optimizer(optimizer);

    let optimized = generator.optimized_task_graph()?;
    assert_eq!(labels(&optimized), vec!["a", "b-cached", "c"]);

    let a = optimized.get("a").expect("a survives");
    assert_eq!(a.dependencies().get("b").map(String::as_str), Some("b-cached"));
    assert_eq!(
        optimized
            .graph()
            .named_edges_from(&"a".to_string())
            .get("b")
            .map(|t| t.as_str()),
        Some("b-cached")
    );

    // The replacement has no dependencies, so nothing points at c any more.
    assert!(optimized.graph().dependents_of(&"c".to_string()).is_empty());
    assert_eq!(
        generator.label_map()?.get("b"),
        Some(&Relabel::Replaced("b-cached".to_string()))
    );
    Ok(())
}

#[test]
fn test_replacement_with_dangling_dependency_is_a_contract_violation() {
    let broken = Task::new("cached", "c2").with_dependency("x", "ghost");
    let optimizer = ScriptedOptimizer::new().replace("c", broken);
    let mut generator = make_generator(chain(), &["a"]).with_optimizer(optimizer);

    match generator.optimized_task_graph() {
        Err(TaskgraphError::CollaboratorContract {
            collaborator,
            source,
        }) => {
            assert_eq!(collaborator, "scripted");
            assert!(matches!(*source, TaskgraphError::DanglingDependency { .. }));
        }
        other => panic!("expected contract violation, got {other:?}"),
    }
}

#[test]
fn test_do_not_optimize_skips_the_optimizer() -> TestResult {
    let optimizer = ScriptedOptimizer::new().remove("a").remove("b").remove("c");
    let seen = optimizer.seen();
    let options = GeneratorOptions {
        do_not_optimize: label_set(&["c"]),
        ..GeneratorOptions::default()
    };
    let mut generator = make_generator_with_options(chain(), &["a"], options)
        .with_optimizer(optimizer);

    assert_eq!(labels(&*generator.optimized_task_graph()?), vec!["c"]);
    let consulted: Vec<Label> = seen.lock().unwrap().iter().map(|(l, _)| l.clone()).collect();
    assert_eq!(consulted, vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_target_tasks_can_be_exempt_from_optimization() -> TestResult {
    let optimizer = ScriptedOptimizer::new().remove("a").remove("b");
    let seen = optimizer.seen();
    let options = GeneratorOptions {
        optimize_target_tasks: false,
        ..GeneratorOptions::default()
    };
    let mut generator = make_generator_with_options(chain(), &["a"], options)
        .with_optimizer(optimizer);

    assert_eq!(labels(&*generator.optimized_task_graph()?), vec!["a", "b", "c"]);
    let consulted: Vec<Label> = seen.lock().unwrap().iter().map(|(l, _)| l.clone()).collect();
    assert_eq!(consulted, vec!["b", "c"]);
    Ok(())
}

#[test]
fn test_cycles_surface_at_the_optimization_stage() -> TestResult {
    let tasks = vec![
        TaskBuilder::new("a").after("b").build(),
        TaskBuilder::new("b").after("a").build(),
    ];
    let mut generator = make_generator(tasks, &["a"]);

    assert_eq!(generator.target_task_graph()?.len(), 2);
    match generator.optimized_task_graph() {
        Err(TaskgraphError::Cycle { members }) => assert_eq!(members, vec!["a", "b"]),
        other => panic!("expected cycle error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_morph_passes_run_in_order() -> TestResult {
    let first = FnMorph::new("add-m1", |graph: &TaskGraph| {
        let mut tasks: Vec<Task> = graph.tasks().cloned().collect();
        tasks.push(Task::new("morph", "m1"));
        Ok(tasks)
    });
    let second = FnMorph::new("add-m2", |graph: &TaskGraph| {
        if !graph.contains("m1") {
            bail!("m1 should have been added first");
        }
        let mut tasks: Vec<Task> = graph.tasks().cloned().collect();
        tasks.push(TaskBuilder::new("m2").kind("morph").after("m1").build());
        Ok(tasks)
    });

    let mut generator = make_generator(chain(), &["b"])
        .with_morph(first)
        .with_morph(second);

    let morphed = generator.morphed_task_graph()?;
    assert_eq!(labels(&morphed), vec!["b", "c", "m1", "m2"]);
    // The optimized graph is left alone.
    assert_eq!(labels(&*generator.optimized_task_graph()?), vec!["b", "c"]);
    Ok(())
}

#[test]
fn test_invalid_morph_output_names_the_pass() {
    let pass = FnMorph::new("dangling", |graph: &TaskGraph| {
        let mut tasks: Vec<Task> = graph.tasks().cloned().collect();
        tasks.push(TaskBuilder::new("m").after("ghost").build());
        Ok(tasks)
    });
    let mut generator = make_generator(chain(), &["a"]).with_morph(pass);

    match generator.morphed_task_graph() {
        Err(TaskgraphError::CollaboratorContract { collaborator, .. }) => {
            assert_eq!(collaborator, "dangling");
        }
        other => panic!("expected contract violation, got {other:?}"),
    }
}

#[test]
fn test_failing_morph_pass_is_reported() {
    let pass = FnMorph::new("explodes", |_: &TaskGraph| Err(anyhow!("kaboom")));
    let mut generator = make_generator(chain(), &["a"]).with_morph(pass);

    assert!(matches!(
        generator.morphed_task_graph(),
        Err(TaskgraphError::Collaborator { collaborator, .. }) if collaborator == "explodes"
    ));
}
