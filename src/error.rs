//! # Error Types
//!
//! Every fallible operation in the pipeline returns a [`PipelineError`]. Nothing
//! is recovered locally: a failing tool or filesystem call aborts the run and the
//! error is surfaced as-is, with enough context to reproduce the failing command.

use crate::nco::Tool;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring or running the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse JSON configuration: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("Failed to parse YAML configuration: {0}")]
    ConfigYaml(#[from] serde_yaml::Error),

    #[error("{tool} not found (tried '{}'); is NCO installed and on PATH?", .program.display())]
    ToolNotFound { tool: Tool, program: PathBuf },

    #[error("{tool} exited with {status}\n  command: {command}\n  stderr: {stderr}")]
    ToolFailed {
        tool: Tool,
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Input '{}' is missing required variables: {}", .path.display(), .missing.join(", "))]
    MissingVariables { path: PathBuf, missing: Vec<String> },

    #[error("Invalid temp file pattern: {0}")]
    InvalidPattern(String),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("NCO script not found: {}", .0.display())]
    MissingScript(PathBuf),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
