use std::collections::BTreeSet;
use std::error::Error;

use serde_json::json;
use taskgraph::errors::TaskgraphError;
use taskgraph::task::{Task, TaskGraph};
use taskgraph_test_utils::builders::{TaskBuilder, graph_of};

type TestResult = Result<(), Box<dyn Error>>;

fn set(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

#[test]
fn kind_is_always_an_attribute() {
    let task = Task::new("build", "b")
        .with_attributes(serde_json::Map::new())
        .with_attribute("kind", json!("other"));
    assert_eq!(task.attribute("kind"), Some(&json!("build")));
    assert_eq!(task.kind(), "build");
}

#[test]
fn from_tasks_derives_edges_from_dependencies() -> TestResult {
    let graph = TaskGraph::from_tasks(vec![
        TaskBuilder::new("a").dep("dep", "b").dep("tool", "c").build(),
        TaskBuilder::new("b").build(),
        TaskBuilder::new("c").build(),
    ])?;

    assert_eq!(graph.graph().nodes(), &set(&["a", "b", "c"]));
    assert_eq!(graph.graph().edges().len(), 2);
    let named = graph.graph().named_edges_from(&"a".to_string());
    assert_eq!(named.get("dep").map(|t| t.as_str()), Some("b"));
    assert_eq!(named.get("tool").map(|t| t.as_str()), Some("c"));
    Ok(())
}

#[test]
fn from_tasks_rejects_dangling_dependencies() {
    let result = TaskGraph::from_tasks(vec![TaskBuilder::new("a").dep("dep", "ghost").build()]);

    match result {
        Err(TaskgraphError::DanglingDependency {
            label,
            dependency_name,
            target,
        }) => {
            assert_eq!(label, "a");
            assert_eq!(dependency_name, "dep");
            assert_eq!(target, "ghost");
        }
        other => panic!("expected dangling dependency, got {other:?}"),
    }
}

#[test]
fn from_tasks_rejects_duplicate_labels() {
    let result = TaskGraph::from_tasks(vec![
        TaskBuilder::new("a").build(),
        TaskBuilder::new("a").build(),
    ]);
    assert!(matches!(result, Err(TaskgraphError::DuplicateLabel(l)) if l == "a"));
}

#[test]
fn soft_and_if_dependencies_do_not_need_to_exist() -> TestResult {
    let graph = TaskGraph::from_tasks(vec![
        TaskBuilder::new("a").soft("elsewhere").if_dep("nowhere").build(),
    ])?;
    assert!(graph.graph().edges().is_empty());
    Ok(())
}

#[test]
fn tasks_keep_insertion_order() -> TestResult {
    let graph = TaskGraph::from_tasks(vec![
        TaskBuilder::new("zeta").build(),
        TaskBuilder::new("alpha").build(),
        TaskBuilder::new("mid").after("alpha").build(),
    ])?;
    assert_eq!(graph.labels().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    Ok(())
}

#[test]
fn sub_keeps_closed_subsets() -> TestResult {
    let graph = graph_of(vec![
        TaskBuilder::new("a").after("b").soft("c").if_dep("c"),
        TaskBuilder::new("b"),
        TaskBuilder::new("c"),
    ]);

    let sub = graph.sub(&set(&["a", "b"]))?;
    assert_eq!(sub.labels().collect::<Vec<_>>(), vec!["a", "b"]);

    let a = sub.get("a").expect("a present");
    assert!(a.soft_dependencies().is_empty());
    assert!(a.if_dependencies().is_empty());
    assert_eq!(a.dependencies().get("b").map(String::as_str), Some("b"));

    // The source graph is untouched.
    assert_eq!(graph.get("a").expect("a").soft_dependencies(), ["c"]);
    Ok(())
}

#[test]
fn sub_rejects_subsets_missing_hard_dependencies() {
    let graph = graph_of(vec![TaskBuilder::new("a").after("b"), TaskBuilder::new("b")]);

    match graph.sub(&set(&["a"])) {
        Err(TaskgraphError::DanglingDependency { label, target, .. }) => {
            assert_eq!(label, "a");
            assert_eq!(target, "b");
        }
        other => panic!("expected dangling dependency, got {other:?}"),
    }
}

#[test]
fn sub_rejects_unknown_labels() {
    let graph = graph_of(vec![TaskBuilder::new("a")]);
    assert!(matches!(
        graph.sub(&set(&["a", "nope"])),
        Err(TaskgraphError::TaskNotFound(l)) if l == "nope"
    ));
}

#[test]
fn to_json_matches_documented_shape() -> TestResult {
    let graph = graph_of(vec![
        TaskBuilder::new("a")
            .dep("dep", "b")
            .payload(json!({"foo": {"bar": 1}})),
        TaskBuilder::new("b")
            .attr("thing", json!(true))
            .payload(json!({"foo": {"baz": 1}})),
    ]);

    let expected = json!({
        "a": {
            "attributes": {"kind": "task"},
            "dependencies": {"dep": "b"},
            "description": "",
            "kind": "task",
            "label": "a",
            "optimization": null,
            "soft_dependencies": [],
            "if_dependencies": [],
            "task": {"foo": {"bar": 1}},
        },
        "b": {
            "attributes": {"kind": "task", "thing": true},
            "dependencies": {},
            "description": "",
            "kind": "task",
            "label": "b",
            "optimization": null,
            "soft_dependencies": [],
            "if_dependencies": [],
            "task": {"foo": {"baz": 1}},
        },
    });
    assert_eq!(graph.to_json(), expected);
    Ok(())
}

#[test]
fn from_json_restores_what_to_json_wrote() -> TestResult {
    let graph = graph_of(vec![
        TaskBuilder::new("a")
            .kind("build")
            .after("b")
            .soft("b")
            .optimization(json!({"never": null})),
        TaskBuilder::new("b").attr("platform", json!("linux")),
    ]);

    let restored = TaskGraph::from_json(graph.to_json())?;
    assert_eq!(restored.to_json(), graph.to_json());
    assert_eq!(restored.get("a").expect("a").kind(), "build");
    Ok(())
}

#[test]
fn serialized_output_keeps_insertion_order() -> TestResult {
    let graph = graph_of(vec![TaskBuilder::new("second"), TaskBuilder::new("first")]);
    let text = serde_json::to_string(&graph)?;
    let second = text.find("\"second\"").expect("second present");
    let first = text.find("\"first\"").expect("first present");
    assert!(second < first);

    let back: TaskGraph = serde_json::from_str(&text)?;
    assert_eq!(back.labels().collect::<Vec<_>>(), vec!["second", "first"]);
    Ok(())
}

#[test]
fn to_json_keeps_insertion_order() -> TestResult {
    let graph = graph_of(vec![TaskBuilder::new("zeta"), TaskBuilder::new("alpha")]);
    let json = graph.to_json();
    let keys: Vec<&str> = json
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["zeta", "alpha"]);

    let back = TaskGraph::from_json(json)?;
    assert_eq!(back.labels().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    Ok(())
}

#[test]
fn from_json_rejects_mismatched_keys() {
    let value = json!({"a": {"kind": "task", "label": "b"}});
    assert!(TaskGraph::from_json(value).is_err());
}
