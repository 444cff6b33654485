//! Error types for dbdesk-server

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dbdesk_core::CoreError;
use dbdesk_normalize::ConversionError;
use thiserror::Error;
use tracing::warn;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Server is in read-only mode")]
    ReadOnly,

    #[error("{0}")]
    Database(#[from] mongodb::error::Error),

    #[error("{0}")]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    Plan(#[from] CoreError),

    /// Reported as a JSON `{"error": ...}` body
    #[error("{0}")]
    Ai(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn missing(fields: &str) -> Self {
        ApiError::BadRequest(format!("Missing {}", fields))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Conversion(_) | ApiError::Plan(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ReadOnly => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Ai(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }

        match self {
            ApiError::Ai(message) => {
                (status, Json(serde_json::json!({ "error": message }))).into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
