//! Runtime startup errors.

use homes_config_and_utils::CoreError;
use homes_database::DatabaseError;
use homes_executor::ExecutorError;
use thiserror::Error;

/// Errors raised while starting or driving the runtime.
///
/// Command flows never fail this way; they report through notices.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),
}

/// Result type alias using RuntimeError.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
