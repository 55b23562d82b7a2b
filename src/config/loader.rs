// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ConfigFile, Parameters, RawConfigFile};
use crate::config::validate::validate_config;
use crate::errors::Result;
use crate::task::TaskGraph;

/// Load a TOML task file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a serialized task graph (the JSON written by `--format json`).
///
/// Parameters take their defaults; tasks keep the order of the file.
pub fn load_graph_dump(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let graph: TaskGraph = serde_json::from_str(&contents)?;
    let tasks = graph.tasks().cloned().collect::<Vec<_>>();

    let parameters = Parameters::default();
    validate_config(&parameters, &tasks)?;
    Ok(ConfigFile::new_unchecked(parameters, tasks))
}

/// Load and validate a task file.
///
/// Files ending in `.json` are read with [`load_graph_dump`]; anything else
/// is treated as TOML.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext == "json") {
        return load_graph_dump(path);
    }

    let raw_config = load_from_path(path)?;
    ConfigFile::try_from(raw_config)
}

