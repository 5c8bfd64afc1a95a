//! Errors raised by the scheduling engine and its data-store collaborator.

use thiserror::Error;

/// Failure reported by a [`SchedulingStore`](super::store::SchedulingStore)
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("stored record is invalid: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("data access failed: {0}")]
    DataAccess(#[from] DataAccessError),
}

impl SchedulingError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(target: "scheduling::validation", %message, "validation error");
        Self::Validation(message)
    }
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;
