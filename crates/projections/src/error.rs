//! Projection error types.

use common::FailureKind;
use thiserror::Error;

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Loading or hydrating the basket failed.
    #[error("Domain error: {0}")]
    Domain(#[from] domain::DomainError),

    /// A read model document could not be encoded or decoded.
    #[error("Read model serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The read model database failed.
    #[error("Read model database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ProjectionError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ProjectionError::Domain(e) => e.kind(),
            ProjectionError::Serialization(_) => FailureKind::UnexpectedFailure,
            ProjectionError::Database(_) => FailureKind::DependencyFailure,
        }
    }
}

/// Errors that stop the change notifier.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The change source could not be reached within the retry budget.
    #[error("Change source unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },
}

impl NotifierError {
    /// Returns the failure category of this error.
    pub fn kind(&self) -> FailureKind {
        FailureKind::DependencyFailure
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
