//! Harness-specific error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("failed to spawn service '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("process {pid} not found")]
    ProcessNotFound { pid: i32 },

    #[error("marker '{marker}' not observed within {timeout:?}")]
    WatchTimeout { marker: String, timeout: Duration },

    #[error("stream closed before marker '{marker}' was observed")]
    StreamClosed { marker: String },

    #[error("reloaded pipeline config mismatch: expected {expected}, observed {observed}")]
    ConfigMismatch { expected: String, observed: String },

    #[error("service process exited unexpectedly (PID: {pid})")]
    UnexpectedExit { pid: i32 },

    #[error("scenario step called out of order in state '{state}'")]
    OutOfOrder { state: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
