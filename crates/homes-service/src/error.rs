//! Resolution error types.

use homes_core::HomeFailure;
use homes_database::DatabaseError;
use std::sync::Arc;
use thiserror::Error;

/// Why a target could not be resolved or written.
#[derive(Error, Debug, Clone)]
pub enum HomeError {
    /// No such home, or storage failed while looking for it.
    #[error("home '{target}' not found")]
    NotFound {
        target: String,
        #[source]
        source: Option<Arc<DatabaseError>>,
    },

    /// More than one identity carries this display name.
    #[error("player '{0}' can't be uniquely identified")]
    Ambiguous(String),

    /// No identity carries this display name.
    #[error("player '{0}' is not registered")]
    UnknownOwner(String),

    /// The target needs an acting subject and none was given.
    #[error("home '{0}' can't be resolved without a player")]
    Unsupported(String),
}

impl HomeError {
    pub fn not_found(target: impl Into<String>) -> Self {
        HomeError::NotFound {
            target: target.into(),
            source: None,
        }
    }

    /// The comparable projection carried in notices.
    pub fn failure(&self) -> HomeFailure {
        match self {
            HomeError::NotFound { target, .. } => HomeFailure::NotFound(target.clone()),
            HomeError::Ambiguous(owner) => HomeFailure::Ambiguous(owner.clone()),
            HomeError::UnknownOwner(owner) => HomeFailure::UnknownOwner(owner.clone()),
            HomeError::Unsupported(target) => HomeFailure::Unsupported(target.clone()),
        }
    }
}

impl From<HomeError> for HomeFailure {
    fn from(error: HomeError) -> Self {
        error.failure()
    }
}

/// Result type alias using HomeError.
pub type HomeResult<T> = Result<T, HomeError>;
