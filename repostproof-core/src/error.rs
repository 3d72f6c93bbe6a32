//! Error types shared across the core library.

use std::process::ExitStatus;
use thiserror::Error;

/// Custom error types for repostproof-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("External dependency '{0}' not found")]
    DependencyNotFound(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, String),

    #[error("Failed waiting for command '{0}': {1}")]
    CommandWait(String, String),

    #[error("Command '{cmd}' failed ({status}): {stderr}")]
    CommandFailed {
        cmd: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Engine exited successfully but produced no output at '{0}'")]
    OutputMissing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for repostproof-core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

pub fn command_start_error(cmd: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::CommandStart(cmd.to_string(), err.to_string())
}

pub fn command_wait_error(cmd: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::CommandWait(cmd.to_string(), err.to_string())
}

pub fn command_failed_error(
    cmd: &str,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        cmd: cmd.to_string(),
        status,
        stderr: stderr.into(),
    }
}
