//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! reduction to HTTP responses. Full failure detail is logged server-side;
//! callers only ever see a short external message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use conference_core::ports::PortError;
use conference_core::LifecycleError;
use serde::Serialize;
use tracing::{debug, error};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A domain failure from one of the lifecycle orchestrators.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        ApiError::Lifecycle(LifecycleError::Store(err))
    }
}

/// The error payload callers receive.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    /// The status code and short external message for this failure.
    fn reduce(&self) -> (StatusCode, String) {
        match self {
            ApiError::Lifecycle(err) => match err {
                LifecycleError::Validation(message) => {
                    (StatusCode::BAD_REQUEST, message.clone())
                }
                LifecycleError::Unauthenticated => (
                    StatusCode::UNAUTHORIZED,
                    "Authentication required".to_string(),
                ),
                LifecycleError::Forbidden { .. } => (
                    StatusCode::FORBIDDEN,
                    "Requester is not an organizer of this conference".to_string(),
                ),
                LifecycleError::Conflict { .. } => (
                    StatusCode::CONFLICT,
                    "Conference name and edition already exist".to_string(),
                ),
                LifecycleError::ConferenceNotFound(_) => {
                    (StatusCode::NOT_FOUND, "Conference not found".to_string())
                }
                LifecycleError::MissingConfig(what) => {
                    (StatusCode::BAD_REQUEST, format!("{what} not found"))
                }
                LifecycleError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ),
            },
            ApiError::Config(_) | ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.reduce();
        // Internal detail stays in the logs; handlers add operation context.
        if status.is_server_error() {
            error!(%status, detail = %self, "request failed");
        } else {
            debug!(%status, detail = %self, "request rejected");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
