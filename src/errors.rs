//! Error handling for the life log engine
//!
//! Every public operation returns a [`LifeLogResult`]. Errors are local to a
//! single operation: a failure is logged at the operation boundary and handed
//! back to the caller, never turned into a panic.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the life log engine
#[derive(Error, Debug)]
pub enum LifeLogError {
    /// The backend did not complete a read or write: I/O error, timeout,
    /// task failure or a persisted record that no longer decodes.
    #[error("Storage failure during {operation}: {reason}")]
    StorageFailure { operation: String, reason: String },

    #[error("Malformed input: {field} - {message}")]
    MalformedInput { field: String, message: String },

    #[error("Unknown request action: {action}")]
    UnknownRequest { action: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for Result with LifeLogError
pub type LifeLogResult<T> = Result<T, LifeLogError>;

impl LifeLogError {
    /// Create a storage failure
    pub fn storage(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::StorageFailure {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a malformed input error
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unknown_request(action: impl Into<String>) -> Self {
        Self::UnknownRequest {
            action: action.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn is_storage_failure(&self) -> bool {
        matches!(self, LifeLogError::StorageFailure { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LifeLogError::MalformedInput { .. } | LifeLogError::UnknownRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            LifeLogError::StorageFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            LifeLogError::Config { .. } | LifeLogError::Io { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for LifeLogError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// Convert from sled errors
impl From<sled::Error> for LifeLogError {
    fn from(err: sled::Error) -> Self {
        LifeLogError::storage("sled_operation", err)
    }
}

/// Persisted records that fail to (de)serialize count as storage corruption
impl From<serde_json::Error> for LifeLogError {
    fn from(err: serde_json::Error) -> Self {
        LifeLogError::storage("json_codec", err)
    }
}

/// Convert from std::io errors
impl From<std::io::Error> for LifeLogError {
    fn from(err: std::io::Error) -> Self {
        LifeLogError::io("io_operation", err)
    }
}
