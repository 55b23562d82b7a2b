// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskgraph",
    version,
    about = "Generate a task graph and show one of its pipeline stages.",
    long_about = None
)]
pub struct CliArgs {
    /// Pipeline stage to show.
    #[arg(value_enum, value_name = "STAGE")]
    pub stage: StageSelector,

    /// Path to the task file (TOML, or a JSON task graph dump).
    #[arg(long, value_name = "PATH", default_value = "taskgraph.toml")]
    pub config: String,

    /// Only show tasks whose label matches this regular expression
    /// (matched from the start of the label).
    #[arg(long = "tasks", value_name = "REGEX")]
    pub tasks_regex: Option<String>,

    /// Dot-path of a key to drop from every task, e.g. `task.env`.
    /// May be repeated.
    #[arg(long = "exclude-key", value_name = "PATH")]
    pub exclude_keys: Vec<String>,

    /// Write the result to this file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Labels)]
    pub format: OutputFormat,

    /// Level for all diagnostics on stderr. Overrides `TASKGRAPH_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Stage selector as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum StageSelector {
    /// Labels of every task (same as `full`).
    Tasks,
    /// The full task graph.
    Full,
    /// The target task set (seed labels, in seed order).
    Target,
    /// The target task graph.
    TargetGraph,
    /// The optimized task graph.
    Optimized,
    /// The morphed task graph.
    Morphed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One label per line.
    Labels,
    /// Pretty-printed JSON mapping label to task.
    Json,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
