// src/error.rs

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VqError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plotting error: {0}")]
    Plot(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Comparison not available: {0}")]
    NotComparable(String),

    #[error("Analysis worker stopped unexpectedly: {0}")]
    Worker(String),
}

// Define a standard Result type for the crate
pub type Result<T> = std::result::Result<T, VqError>;

/// Failures of a single process invocation.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process exceeded the {}s time limit and was terminated", .limit.as_secs_f64())]
    Timeout { limit: Duration },

    #[error("I/O error while waiting on process: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-codec failure kinds. Stored inside comparison records, so it owns only plain data.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("analysis tool could not be launched: {0}")]
    LaunchFailure(String),

    #[error("analysis tool exited with code {code}")]
    NonZeroExit { code: i32 },

    #[error("metrics missing from tool output: {}", .missing.join(", "))]
    ParseIncomplete { missing: Vec<String> },

    #[error("analysis timed out after {seconds}s")]
    Timeout { seconds: f64 },

    #[error("I/O error during analysis: {0}")]
    Io(String),

    #[error("job has already been executed")]
    AlreadyExecuted,
}

impl From<RunnerError> for AnalysisError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Launch { .. } => AnalysisError::LaunchFailure(err.to_string()),
            RunnerError::Timeout { limit } => AnalysisError::Timeout {
                seconds: limit.as_secs_f64(),
            },
            RunnerError::Io(e) => AnalysisError::Io(e.to_string()),
        }
    }
}
