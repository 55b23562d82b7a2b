// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod filter;
pub mod generator;
pub mod graph;
pub mod logging;
pub mod morph;
pub mod optimize;
pub mod task;
pub mod value;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::{CliArgs, OutputFormat, StageSelector};
use crate::config::{ParameterTargets, load_and_validate};
use crate::filter::filter;
use crate::generator::Generator;
use crate::optimize::StrategyOptimizer;
use crate::task::TaskGraph;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task file loading (the task source and target parameters)
/// - the generator with the built-in optimization strategies
/// - stage selection, filtering and output
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("failed to load task file '{}'", args.config))?;

    let targets = ParameterTargets::new(cfg.parameters.clone());
    let options = cfg.parameters.generator_options();
    let mut generator = Generator::new(cfg, targets)
        .with_optimizer(StrategyOptimizer::with_builtins())
        .with_options(options);

    let stdout = io::stdout();
    let stderr = io::stderr();
    run_with(&args, &mut generator, &mut stdout.lock(), &mut stderr.lock())
}

/// Show the stage selected by `args`, computed by `generator`.
///
/// The result goes to `args.output_file` when set, otherwise to `out`;
/// status lines go to `diag`.
pub fn run_with(
    args: &CliArgs,
    generator: &mut Generator,
    out: &mut dyn Write,
    diag: &mut dyn Write,
) -> Result<()> {
    let graph = select_stage(generator, args.stage)?;
    let exclude = (!args.exclude_keys.is_empty()).then_some(args.exclude_keys.as_slice());
    let filtered = filter(&graph, args.tasks_regex.as_deref(), exclude)?;

    writeln!(diag, "Dumping result with {} tasks", filtered.len())?;

    match &args.output_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file '{}'", path.display()))?;
            let mut writer = BufWriter::new(file);
            dump(&filtered, args.format, &mut writer)?;
            writer.flush()?;
            debug!(path = %path.display(), "wrote result to file");
        }
        None => dump(&filtered, args.format, out)?,
    }

    Ok(())
}

/// Resolve a CLI stage selector to a task graph.
///
/// `target` is shown as the full task graph's view of the seed labels, in
/// seed order.
pub fn select_stage(generator: &mut Generator, stage: StageSelector) -> Result<Rc<TaskGraph>> {
    let graph = match stage {
        StageSelector::Tasks | StageSelector::Full => generator.full_task_graph()?,
        StageSelector::Target => {
            let full = generator.full_task_graph()?;
            let seeds = generator.target_task_set()?;
            Rc::new(full.select(&seeds))
        }
        StageSelector::TargetGraph => generator.target_task_graph()?,
        StageSelector::Optimized => generator.optimized_task_graph()?,
        StageSelector::Morphed => generator.morphed_task_graph()?,
    };
    Ok(graph)
}

fn dump(graph: &TaskGraph, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Labels => {
            for label in graph.labels() {
                writeln!(out, "{label}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, graph)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
