//! HTTP response types and utilities
//!
//! Every JSON endpoint answers with the [`ApiResponse`] envelope so clients
//! can branch on `success` without looking at the status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::errors::{AppError, ImportError};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human readable summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
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
            message: None,
            error: None,
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn success_with_message<S: Into<String>>(data: T, message: S) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(message.into()),
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error_with_details<S: Into<String>>(message: S, details: serde_json::Value) -> Self {
        Self {
            details: Some(details),
            ..Self::error(message)
        }
    }
}

/// Status code, message and optional details for an application error
fn error_parts(error: &AppError) -> (StatusCode, String, Option<serde_json::Value>) {
    match error {
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone(), None),
        AppError::Import(ImportError::Rejected { errors }) => (
            StatusCode::BAD_REQUEST,
            "File failed validation".to_string(),
            Some(serde_json::json!({ "errors": errors })),
        ),
        AppError::Import(import_error) if import_error.is_client_error() => {
            (StatusCode::BAD_REQUEST, import_error.to_string(), None)
        }
        AppError::Import(_) | AppError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database operation failed".to_string(),
            None,
        ),
        AppError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Data access failed".to_string(),
            None,
        ),
        AppError::NotFound { resource, id } => (
            StatusCode::NOT_FOUND,
            format!("{resource} with id '{id}' not found"),
            None,
        ),
        AppError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            "Authentication required".to_string(),
            None,
        ),
        AppError::PermissionDenied { action, resource } => (
            StatusCode::FORBIDDEN,
            format!("Permission denied: {action} on {resource}"),
            None,
        ),
        AppError::Configuration { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Configuration error: {message}"),
            None,
        ),
        AppError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {message}"),
            None,
        ),
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, message, details) = error_parts(&error);
    if status.is_server_error() {
        error!(error = %error, "Request failed");
    }

    let body = match details {
        Some(details) => ApiResponse::error_with_details(message, details),
        None => ApiResponse::error(message),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub fn ok_with_message<T: Serialize, S: Into<String>>(data: T, message: S) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::success_with_message(data, message)),
    )
        .into_response()
}

pub fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message))).into_response()
}
