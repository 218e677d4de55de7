/// Unified error types for the complaints service
use crate::complaints::ComplaintStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Referenced complaint, notification, feedback or user is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Status change that would move a complaint backwards
    #[error("Invalid status transition from {} to {}", from.as_str(), to.as_str())]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Conflict errors (e.g., duplicate document id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image storage errors
    #[error("Image storage error: {0}")]
    ImageStorage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}


impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.to_string())
    }
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ServiceError to HTTP response
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            ServiceError::Validation(_) | ServiceError::InvalidTransition { .. } => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            ServiceError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            ServiceError::Authorization(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            ServiceError::Database(_)
            | ServiceError::Serialization(_)
            | ServiceError::ImageStorage(_)
            | ServiceError::Io(_)
            | ServiceError::Internal(_) => {
                tracing::error!("Backend failure: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
