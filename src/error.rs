//! Unified API error handling
//!
//! Provides consistent error responses across all endpoints.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::scheduling::{DataAccessError, SchedulingError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Data access error")]
    DataAccess(#[source] DataAccessError),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::DataAccess(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::DataAccess(_) => "DATA_ACCESS_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg) => msg.clone(),
            Self::BadRequest(msg) => msg.clone(),
            // Don't leak internal error details
            Self::DataAccess(_) => "Scheduling data is temporarily unavailable".to_string(),
        }
    }
}

impl From<DataAccessError> for ApiError {
    fn from(e: DataAccessError) -> Self {
        match e {
            DataAccessError::NotFound(what) => Self::NotFound(format!("{} not found", what)),
            other => Self::DataAccess(other),
        }
    }
}

impl From<SchedulingError> for ApiError {
    fn from(e: SchedulingError) -> Self {
        match e {
            SchedulingError::Validation(msg) => Self::BadRequest(msg),
            SchedulingError::DataAccess(inner) => inner.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::DataAccess(e) => {
                tracing::error!(error = ?e, "Data access error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduling_errors_map_to_status() {
        let validation: ApiError = SchedulingError::Validation("bad range".to_string()).into();
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.public_message(), "bad range");

        let missing: ApiError =
            SchedulingError::DataAccess(DataAccessError::NotFound("assignment 1".to_string()))
                .into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let db: ApiError = DataAccessError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(db.error_code(), "DATA_ACCESS_ERROR");
        assert!(!db.public_message().contains("pool"));
    }
}
