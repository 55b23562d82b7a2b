// src/logging.rs

//! Diagnostics go to stderr through `tracing`; stdout carries only the
//! dumped graph.
//!
//! `--log-level` sets one level for every target. Without it,
//! `TASKGRAPH_LOG` is read as a list of filter directives, so
//! `TASKGRAPH_LOG=taskgraph::optimize=debug,warn` narrows debug output to the
//! optimizer. With neither, only warnings and errors are shown.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "TASKGRAPH_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the global stderr subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = log_filter(cli_level, env.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("cannot install log subscriber: {e}"))
}

/// Filter for a CLI level and the raw value of [`LOG_ENV`]. The CLI level
/// wins; a blank variable counts as unset.
pub fn log_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(LevelFilter::from(level).to_string()));
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| anyhow!("invalid {LOG_ENV} value '{directives}': {e}")),
        None => Ok(EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}
