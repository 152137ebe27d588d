//! Executor error types.

use thiserror::Error;

/// Executor error type.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The Controlling thread has stopped accepting work.
    #[error("executor is shut down")]
    Shutdown,

    /// A runtime or thread could not be started.
    #[error("failed to start executor: {0}")]
    Startup(#[from] std::io::Error),
}

/// Result type alias using ExecutorError.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
