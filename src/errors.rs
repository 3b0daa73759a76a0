//! Typed error hierarchy for the Whimbrel engine.
//!
//! Three top-level enums cover the three subsystems:
//! - `MaterializeError` — blueprint expansion failures (run never starts)
//! - `ExecutionError` — runner and task failures (run aborts at the step)
//! - `FsError` — filesystem abstraction failures

use thiserror::Error;

/// Errors raised while materializing a blueprint into an execution plan.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Task id '{id}' is not of the form facet:name")]
    InvalidTaskId { id: String },

    #[error("Task '{task_id}' references unknown facet '{facet}'")]
    UnknownFacet { facet: String, task_id: String },

    #[error("Facet '{facet}' has no task named '{task}'")]
    UnknownTask { facet: String, task: String },

    #[error("Augmentation of step '{step}' failed: {message}")]
    AugmentationFailed { step: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised while executing a materialized plan.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Step '{step}' is missing required parameter '{parameter}'")]
    MissingParameter { step: String, parameter: String },

    #[error("No actor registered under id '{id}'")]
    ActorNotFound { id: String },

    #[error("Step '{step}' is not bound to an actor")]
    UnboundActor { step: String },

    #[error("Step '{step}' failed: {message}")]
    TaskFailed { step: String, message: String },

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecutionError {
    /// Wrap an arbitrary failure with the id of the step it occurred in.
    pub fn task_failed(step: &str, err: impl std::fmt::Display) -> Self {
        Self::TaskFailed {
            step: step.to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors from the filesystem abstraction.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Path not found: {path}")]
    NotFound { path: std::path::PathBuf },

    #[error("Path already exists: {path}")]
    AlreadyExists { path: std::path::PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: std::path::PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON at {path}: {source}")]
    Json {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl FsError {
    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
