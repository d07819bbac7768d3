//! # Web API Error Types
//!
//! HTTP mapping for [`TodoError`] and boundary failures. Every error body has the shape
//! `{"error": {"code": ..., "message": ...}}`.
//!
//! A missing task and a task owned by someone else both arrive here as
//! [`TodoError::NotFound`] and leave as the same 400 response.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::TodoError;
use crate::logging::log_error;
use crate::web::auth::AuthError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Authentication required: {reason}")]
    Unauthorized { reason: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Storage operation failed: {operation}")]
    StorageError { operation: String },

    #[error("Internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code, message) = match &self {
            ApiError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.as_str())
            }

            ApiError::NotFound { message } => {
                (StatusCode::BAD_REQUEST, "NOT_FOUND", message.as_str())
            }

            ApiError::Unauthorized { reason } => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", reason.as_str())
            }

            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid username or password",
            ),

            ApiError::StorageError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "Storage operation failed",
            ),

            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": message
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl From<TodoError> for ApiError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::ValidationError(message) => ApiError::BadRequest { message },
            TodoError::NotFound(message) => ApiError::NotFound { message },
            TodoError::InvalidCredentials => ApiError::InvalidCredentials,
            TodoError::StorageError { operation, message } => {
                log_error("web", &operation, &message, None);
                ApiError::StorageError { operation }
            }
            TodoError::ConfigurationError(message) => {
                error!(error = %message, "Configuration failure while serving request");
                ApiError::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingSession => ApiError::unauthorized("Missing session"),
            AuthError::InvalidAuthFormat => {
                ApiError::unauthorized("Authorization header must use Bearer scheme")
            }
            AuthError::JwtError(_) => ApiError::unauthorized("Invalid or expired session"),
            AuthError::ConfigurationError(message) => {
                error!(error = %message, "Session configuration failure");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}
