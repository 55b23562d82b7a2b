//! Shared helpers for `taskgraph` integration tests.
//!
//! - [`builders`]: task and generator builders.
//! - [`fakes`]: scripted collaborators for the generator pipeline.

pub mod builders;
pub mod fakes;

use taskgraph::logging::{LOG_ENV, log_filter};

/// Route pipeline diagnostics into the test harness.
///
/// Reads the same `TASKGRAPH_LOG` directives as the binary, so
/// `TASKGRAPH_LOG=taskgraph::generator=debug cargo test -- --nocapture`
/// shows stage computation. Later calls in the same binary are no-ops.
pub fn init_tracing() {
    let env = std::env::var(LOG_ENV).ok();
    let Ok(filter) = log_filter(None, env.as_deref()) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
