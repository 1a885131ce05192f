//! HTTP response types and error mapping
//!
//! Successful JSON endpoints return their payload directly; failures and
//! maintenance actions use the [`ApiResponse`] envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::errors::AppError;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Response timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// HTTP status for each error category.
pub const fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Parameter(_) => StatusCode::BAD_REQUEST,
        AppError::Download(_) => StatusCode::BAD_GATEWAY,
        AppError::Decode(_)
        | AppError::Encode(_)
        | AppError::Cache { .. }
        | AppError::Configuration { .. }
        | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert an [`AppError`] into a status code plus error envelope.
pub fn handle_error(error: AppError) -> Response {
    let status = status_for(&error);
    let message = match &error {
        AppError::Parameter(e) => format!("Invalid request: {e}"),
        AppError::Download(e) => format!("Failed to fetch image: {e}"),
        AppError::Decode(message) => format!("Failed to decode image: {message}"),
        AppError::Encode(message) => format!("Failed to encode image: {message}"),
        AppError::Cache { message } => format!("Cache error: {message}"),
        AppError::Configuration { message } => format!("Configuration error: {message}"),
        AppError::Internal { message } => format!("Internal error: {message}"),
    };

    if status.is_server_error() {
        error!(status = status.as_u16(), "{}", message);
    } else {
        warn!(status = status.as_u16(), "{}", message);
    }

    (status, Json(ApiResponse::error(message))).into_response()
}

/// 200 with `data` as a bare JSON body.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// 200 with `data` wrapped in the [`ApiResponse`] envelope.
pub fn ok_enveloped<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 401 with an error envelope.
pub fn unauthorized<S: Into<String>>(message: S) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiResponse::error(message))).into_response()
}
