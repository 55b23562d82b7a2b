// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskgraphError {
    /// A task declares a hard dependency on a label that is not part of the
    /// same task graph.
    #[error("task '{label}' has dependency '{dependency_name}' on unknown task '{target}'")]
    DanglingDependency {
        label: String,
        dependency_name: String,
        target: String,
    },

    /// A topological order was requested over a graph that contains a cycle.
    #[error("cycle detected in task graph involving: {}", members.join(", "))]
    Cycle { members: Vec<String> },

    /// An optimizer or morph pass produced a graph that breaks the task graph
    /// invariants.
    #[error("collaborator '{collaborator}' produced an invalid task graph: {source}")]
    CollaboratorContract {
        collaborator: String,
        #[source]
        source: Box<TaskgraphError>,
    },

    /// An external collaborator failed on its own terms.
    #[error("collaborator '{collaborator}' failed: {source}")]
    Collaborator {
        collaborator: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Duplicate task label: {0}")]
    DuplicateLabel(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid task regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskgraphError {
    /// Wrap an integrity failure as a contract violation of `collaborator`.
    pub fn contract_violation(collaborator: impl Into<String>, source: TaskgraphError) -> Self {
        TaskgraphError::CollaboratorContract {
            collaborator: collaborator.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error returned by `collaborator` itself.
    pub fn collaborator(collaborator: impl Into<String>, source: anyhow::Error) -> Self {
        TaskgraphError::Collaborator {
            collaborator: collaborator.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TaskgraphError>;
