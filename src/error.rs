use std::fmt::Display;
use thiserror::Error;

/// Errors surfaced by the task and user services.
///
/// Concurrent reorders of the same user's tasks are resolved last-writer-wins on the
/// priority column and never produce an error of their own.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TodoError {
    /// Missing or invalid owner, malformed priority sentinels, bad input fields.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Task or user absent, or owned by someone else. The two cases are indistinguishable.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transaction or query failure, wrapped with the failing operation.
    #[error("Storage error in {operation}: {message}")]
    StorageError { operation: String, message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl TodoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wrap a storage failure with the operation that produced it.
    pub fn storage(operation: impl Into<String>, err: impl Display) -> Self {
        Self::StorageError {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TodoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_carries_operation() {
        let err = TodoError::storage("store.postgres.create_task", "connection reset");
        assert_eq!(
            err.to_string(),
            "Storage error in store.postgres.create_task: connection reset"
        );
    }

    #[test]
    fn test_not_found_helper() {
        assert!(TodoError::not_found("task 7").is_not_found());
        assert!(!TodoError::InvalidCredentials.is_not_found());
    }
}
