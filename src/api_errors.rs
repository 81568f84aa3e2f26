use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::errors::LifeLogError;

/// HTTP-facing error, rendered as the `{success: false, error}` envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            AppError::Unavailable(s) => (StatusCode::SERVICE_UNAVAILABLE, s),
            AppError::Internal(s) => (StatusCode::INTERNAL_SERVER_ERROR, s),
        };
        (
            code,
            Json(ErrBody {
                success: false,
                error: msg.clone(),
            }),
        )
            .into_response()
    }
}

impl From<LifeLogError> for AppError {
    fn from(err: LifeLogError) -> Self {
        match err {
            LifeLogError::StorageFailure { .. } => AppError::Unavailable(err.to_string()),
            LifeLogError::MalformedInput { .. } => AppError::BadRequest(err.to_string()),
            LifeLogError::UnknownRequest { action } => {
                AppError::BadRequest(format!("Unknown action: {action}"))
            }
            LifeLogError::Config { .. } | LifeLogError::Io { .. } => {
                AppError::Internal(err.to_string())
            }
        }
    }
}
