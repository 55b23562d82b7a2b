// src/generator/mod.rs

//! The task graph generation pipeline.
//!
//! ```text
//! full_task_graph -> target_task_set -> target_task_graph
//!                 -> optimized_task_graph -> morphed_task_graph
//! ```
//!
//! Every stage is computed on first access from the previous stages and the
//! matching collaborator, then cached for the lifetime of the [`Generator`].
//!
//! - [`collaborators`] defines the traits the pipeline calls out to.
//! - [`target`] computes the target closure.

pub mod collaborators;
pub mod target;

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use tracing::{info, trace};

use crate::errors::{Result, TaskgraphError};
use crate::morph::apply_morphs;
use crate::optimize::{LabelMap, optimize_task_graph};
use crate::task::{Label, TaskGraph};

pub use collaborators::{
    Decision, KeepAll, MorphPass, OptimizeContext, Optimizer, TargetResolver, TaskLoader,
};

/// Named pipeline stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    FullTaskGraph,
    TargetTaskSet,
    TargetTaskGraph,
    OptimizedTaskGraph,
    MorphedTaskGraph,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::FullTaskGraph,
        Stage::TargetTaskSet,
        Stage::TargetTaskGraph,
        Stage::OptimizedTaskGraph,
        Stage::MorphedTaskGraph,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::FullTaskGraph => "full_task_graph",
            Stage::TargetTaskSet => "target_task_set",
            Stage::TargetTaskGraph => "target_task_graph",
            Stage::OptimizedTaskGraph => "optimized_task_graph",
            Stage::MorphedTaskGraph => "morphed_task_graph",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Knobs of the target and optimization stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// When `false`, target tasks are never optimized.
    pub optimize_target_tasks: bool,
    /// Labels exempt from optimization.
    pub do_not_optimize: BTreeSet<Label>,
    /// Add tasks flagged `always_target` as extra closure roots.
    pub enable_always_target: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            optimize_target_tasks: true,
            do_not_optimize: BTreeSet::new(),
            enable_always_target: false,
        }
    }
}

#[derive(Debug, Default)]
struct StageCache {
    full: Option<Rc<TaskGraph>>,
    target_set: Option<Rc<Vec<Label>>>,
    target_graph: Option<Rc<TaskGraph>>,
    optimized: Option<(Rc<TaskGraph>, Rc<LabelMap>)>,
    morphed: Option<Rc<TaskGraph>>,
}

impl StageCache {
    fn is_computed(&self, stage: Stage) -> bool {
        match stage {
            Stage::FullTaskGraph => self.full.is_some(),
            Stage::TargetTaskSet => self.target_set.is_some(),
            Stage::TargetTaskGraph => self.target_graph.is_some(),
            Stage::OptimizedTaskGraph => self.optimized.is_some(),
            Stage::MorphedTaskGraph => self.morphed.is_some(),
        }
    }
}

/// Single-use driver of the pipeline.
///
/// Stage accessors return shared handles; asking twice for the same stage
/// returns the same value without recomputing it.
pub struct Generator {
    loader: Box<dyn TaskLoader>,
    resolver: Box<dyn TargetResolver>,
    optimizer: Box<dyn Optimizer>,
    morphs: Vec<Box<dyn MorphPass>>,
    options: GeneratorOptions,
    cache: StageCache,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("loader", &self.loader.name())
            .field("resolver", &self.resolver.name())
            .field("optimizer", &self.optimizer.name())
            .field(
                "morphs",
                &self.morphs.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("options", &self.options)
            .field("computed", &self.computed_stages())
            .finish()
    }
}

impl Generator {
    /// Generator that keeps every task during optimization and applies no
    /// morph passes.
    pub fn new<L, R>(loader: L, resolver: R) -> Self
    where
        L: TaskLoader + 'static,
        R: TargetResolver + 'static,
    {
        Self {
            loader: Box::new(loader),
            resolver: Box::new(resolver),
            optimizer: Box::new(KeepAll),
            morphs: Vec::new(),
            options: GeneratorOptions::default(),
            cache: StageCache::default(),
        }
    }

    pub fn with_optimizer<O: Optimizer + 'static>(mut self, optimizer: O) -> Self {
        self.optimizer = Box::new(optimizer);
        self
    }

    /// Append a morph pass; passes run in the order they were added.
    pub fn with_morph<M: MorphPass + 'static>(mut self, pass: M) -> Self {
        self.morphs.push(Box::new(pass));
        self
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Stages computed so far, in pipeline order.
    pub fn computed_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|s| self.cache.is_computed(*s))
            .collect()
    }

    /// Every task supplied by the loader.
    pub fn full_task_graph(&mut self) -> Result<Rc<TaskGraph>> {
        if let Some(graph) = &self.cache.full {
            trace!(stage = %Stage::FullTaskGraph, "serving cached stage");
            return Ok(Rc::clone(graph));
        }

        let tasks = self
            .loader
            .load_tasks()
            .map_err(|e| TaskgraphError::collaborator(self.loader.name(), e))?;
        let graph = Rc::new(TaskGraph::from_tasks(tasks)?);
        info!(stage = %Stage::FullTaskGraph, tasks = graph.len(), "generated stage");

        self.cache.full = Some(Rc::clone(&graph));
        Ok(graph)
    }

    /// Seed labels chosen by the target resolver, deduplicated, in seed order.
    pub fn target_task_set(&mut self) -> Result<Rc<Vec<Label>>> {
        if let Some(labels) = &self.cache.target_set {
            trace!(stage = %Stage::TargetTaskSet, "serving cached stage");
            return Ok(Rc::clone(labels));
        }

        let full = self.full_task_graph()?;
        let resolved = self
            .resolver
            .target_tasks(&full)
            .map_err(|e| TaskgraphError::collaborator(self.resolver.name(), e))?;

        let mut seen = BTreeSet::new();
        let mut labels = Vec::with_capacity(resolved.len());
        for label in resolved {
            if !full.contains(&label) {
                return Err(TaskgraphError::TaskNotFound(label));
            }
            if seen.insert(label.clone()) {
                labels.push(label);
            }
        }
        info!(stage = %Stage::TargetTaskSet, tasks = labels.len(), "generated stage");

        let labels = Rc::new(labels);
        self.cache.target_set = Some(Rc::clone(&labels));
        Ok(labels)
    }

    /// The full graph restricted to the closure of the target task set.
    pub fn target_task_graph(&mut self) -> Result<Rc<TaskGraph>> {
        if let Some(graph) = &self.cache.target_graph {
            trace!(stage = %Stage::TargetTaskGraph, "serving cached stage");
            return Ok(Rc::clone(graph));
        }

        let full = self.full_task_graph()?;
        let seeds = self.target_task_set()?;
        let extra_roots = if self.options.enable_always_target {
            target::always_target_tasks(&full)
        } else {
            Vec::new()
        };

        let labels = target::target_closure(&full, &seeds, &extra_roots);
        let graph = Rc::new(full.sub(&labels)?);
        info!(stage = %Stage::TargetTaskGraph, tasks = graph.len(), "generated stage");

        self.cache.target_graph = Some(Rc::clone(&graph));
        Ok(graph)
    }

    /// The target task graph after optimization.
    pub fn optimized_task_graph(&mut self) -> Result<Rc<TaskGraph>> {
        Ok(self.optimized()?.0)
    }

    /// Original labels removed or replaced by optimization.
    pub fn label_map(&mut self) -> Result<Rc<LabelMap>> {
        Ok(self.optimized()?.1)
    }

    fn optimized(&mut self) -> Result<(Rc<TaskGraph>, Rc<LabelMap>)> {
        if let Some((graph, label_map)) = &self.cache.optimized {
            trace!(stage = %Stage::OptimizedTaskGraph, "serving cached stage");
            return Ok((Rc::clone(graph), Rc::clone(label_map)));
        }

        let target_graph = self.target_task_graph()?;
        let mut do_not_optimize = self.options.do_not_optimize.clone();
        if !self.options.optimize_target_tasks {
            do_not_optimize.extend(self.target_task_set()?.iter().cloned());
        }

        let optimized = optimize_task_graph(&target_graph, self.optimizer.as_ref(), &do_not_optimize)?;
        info!(
            stage = %Stage::OptimizedTaskGraph,
            tasks = optimized.graph.len(),
            "generated stage"
        );

        let graph = Rc::new(optimized.graph);
        let label_map = Rc::new(optimized.label_map);
        self.cache.optimized = Some((Rc::clone(&graph), Rc::clone(&label_map)));
        Ok((graph, label_map))
    }

    /// The optimized task graph after every morph pass.
    pub fn morphed_task_graph(&mut self) -> Result<Rc<TaskGraph>> {
        if let Some(graph) = &self.cache.morphed {
            trace!(stage = %Stage::MorphedTaskGraph, "serving cached stage");
            return Ok(Rc::clone(graph));
        }

        let optimized = self.optimized_task_graph()?;
        let graph = Rc::new(apply_morphs(&optimized, &self.morphs)?);
        info!(stage = %Stage::MorphedTaskGraph, tasks = graph.len(), "generated stage");

        self.cache.morphed = Some(Rc::clone(&graph));
        Ok(graph)
    }
}
