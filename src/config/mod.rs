// src/config/mod.rs

//! Task file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a task file from disk (`loader.rs`).
//! - Validate basic invariants like parameter references (`validate.rs`).
//! - Expose the file as generator collaborators (`sources.rs`).

pub mod loader;
pub mod model;
pub mod sources;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_graph_dump};
pub use model::{ConfigFile, Parameters, RawConfigFile, TaskConfig, TaskTable};
pub use sources::ParameterTargets;
pub use validate::validate_config;
