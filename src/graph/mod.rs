// src/graph/mod.rs

//! Generic directed graph with named edges.
//!
//! Edges point from a dependent to one of its dependencies: the edge
//! `(a, b, "build")` reads "`a` depends on `b` under the name `build`".
//!
//! The graph knows nothing about tasks; [`crate::task::TaskGraph`] composes it.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use std::fmt;
use std::hash::Hash;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TaskgraphError};

/// Bounds required of a node identifier.
pub trait NodeId: Ord + Hash + Clone + fmt::Display {}

impl<T: Ord + Hash + Clone + fmt::Display> NodeId for T {}

/// A named edge from `source` (the dependent) to `target` (the dependency).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge<N> {
    pub source: N,
    pub target: N,
    pub name: String,
}

impl<N> Edge<N> {
    pub fn new(source: N, target: N, name: impl Into<String>) -> Self {
        Self {
            source,
            target,
            name: name.into(),
        }
    }
}

/// Immutable directed graph over `N` with named edges.
///
/// Several edges may join the same pair of nodes as long as their names
/// differ. Both endpoints of every edge are always members of the node set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<N = String> {
    nodes: BTreeSet<N>,
    edges: BTreeSet<Edge<N>>,
}

impl<N: NodeId> Default for Graph<N> {
    fn default() -> Self {
        Self {
            nodes: BTreeSet::new(),
            edges: BTreeSet::new(),
        }
    }
}

impl<N: NodeId> Graph<N> {
    /// Build a graph, rejecting edges whose endpoints are not nodes.
    pub fn new(
        nodes: impl IntoIterator<Item = N>,
        edges: impl IntoIterator<Item = Edge<N>>,
    ) -> Result<Self> {
        let nodes: BTreeSet<N> = nodes.into_iter().collect();
        let edges: BTreeSet<Edge<N>> = edges.into_iter().collect();

        for edge in &edges {
            if !nodes.contains(&edge.source) {
                return Err(TaskgraphError::TaskNotFound(edge.source.to_string()));
            }
            if !nodes.contains(&edge.target) {
                return Err(TaskgraphError::DanglingDependency {
                    label: edge.source.to_string(),
                    dependency_name: edge.name.clone(),
                    target: edge.target.to_string(),
                });
            }
        }

        Ok(Self { nodes, edges })
    }

    pub fn nodes(&self) -> &BTreeSet<N> {
        &self.nodes
    }

    pub fn edges(&self) -> &BTreeSet<Edge<N>> {
        &self.edges
    }

    pub fn contains(&self, node: &N) -> bool {
        self.nodes.contains(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Mapping `edge name -> target` for the outgoing edges of `node`.
    pub fn named_edges_from(&self, node: &N) -> BTreeMap<&str, &N> {
        self.edges
            .iter()
            .filter(|e| &e.source == node)
            .map(|e| (e.name.as_str(), &e.target))
            .collect()
    }

    /// Nodes with an edge pointing at `node`.
    pub fn dependents_of(&self, node: &N) -> BTreeSet<&N> {
        self.edges
            .iter()
            .filter(|e| &e.target == node)
            .map(|e| &e.source)
            .collect()
    }

    /// Every node reachable from `roots` through edges whose name satisfies
    /// `follow`, including the roots themselves.
    ///
    /// Roots that are not members of the graph are ignored. Cycles are fine.
    pub fn closure<'r, F>(&self, roots: impl IntoIterator<Item = &'r N>, follow: F) -> BTreeSet<N>
    where
        N: 'r,
        F: Fn(&str) -> bool,
    {
        self.walk(roots, follow, Direction::Outgoing)
    }

    /// Like [`Graph::closure`], but walking edges backwards (from a
    /// dependency to its dependents).
    pub fn reverse_closure<'r, F>(
        &self,
        roots: impl IntoIterator<Item = &'r N>,
        follow: F,
    ) -> BTreeSet<N>
    where
        N: 'r,
        F: Fn(&str) -> bool,
    {
        self.walk(roots, follow, Direction::Incoming)
    }

    /// New graph restricted to the members of `nodes`; edges leaving the
    /// subset are dropped.
    pub fn subgraph(&self, nodes: &BTreeSet<N>) -> Graph<N> {
        let nodes: BTreeSet<N> = self.nodes.intersection(nodes).cloned().collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| nodes.contains(&e.source) && nodes.contains(&e.target))
            .cloned()
            .collect();
        Graph { nodes, edges }
    }

    /// Deterministic topological order with dependencies before their
    /// dependents. Ties are broken by ascending node id.
    pub fn topo_order(&self) -> Result<Vec<N>> {
        self.ordered(true)
    }

    /// Deterministic topological order with dependents before their
    /// dependencies. Ties are broken by ascending node id.
    pub fn reverse_topo_order(&self) -> Result<Vec<N>> {
        self.ordered(false)
    }

    fn walk<'r, F>(
        &self,
        roots: impl IntoIterator<Item = &'r N>,
        follow: F,
        direction: Direction,
    ) -> BTreeSet<N>
    where
        N: 'r,
        F: Fn(&str) -> bool,
    {
        let mut adjacency: HashMap<&N, Vec<&N>> = HashMap::new();
        for edge in self.edges.iter().filter(|e| follow(&e.name)) {
            let (from, to) = match direction {
                Direction::Outgoing => (&edge.source, &edge.target),
                Direction::Incoming => (&edge.target, &edge.source),
            };
            adjacency.entry(from).or_default().push(to);
        }

        let mut visited: BTreeSet<N> = BTreeSet::new();
        let mut stack: Vec<&N> = roots
            .into_iter()
            .filter(|n| self.nodes.contains(*n))
            .collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(next) = adjacency.get(current) {
                stack.extend(next.iter().copied().filter(|n| !visited.contains(*n)));
            }
        }

        visited
    }

    /// Kahn's algorithm over a petgraph view of the graph, always releasing
    /// the smallest ready node first.
    fn ordered(&self, dependencies_first: bool) -> Result<Vec<N>> {
        let mut graph: DiGraphMap<&N, ()> = DiGraphMap::new();
        for node in &self.nodes {
            graph.add_node(node);
        }
        for edge in &self.edges {
            if dependencies_first {
                graph.add_edge(&edge.target, &edge.source, ());
            } else {
                graph.add_edge(&edge.source, &edge.target, ());
            }
        }

        let mut in_degree: HashMap<&N, usize> = graph
            .nodes()
            .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();

        let mut ready: BinaryHeap<Reverse<&N>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| Reverse(*node))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node.clone());
            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(next));
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            return Err(cycle_error(&graph));
        }
        Ok(order)
    }
}

fn cycle_error<N: NodeId>(graph: &DiGraphMap<&N, ()>) -> TaskgraphError {
    let mut members: Vec<String> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || scc.iter().any(|n| graph.contains_edge(*n, *n)))
        .flatten()
        .map(|n| n.to_string())
        .collect();
    members.sort();
    TaskgraphError::Cycle { members }
}
