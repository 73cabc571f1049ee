// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Directions API error: {0}")]
    Directions(String),

    #[error("Upstream API error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the error came from talking to another service rather than
    /// from the request itself. Sync loops keep stale data for these.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Upstream(_) | AppError::Directions(_) | AppError::Database(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "permission_denied", None),
            AppError::LocationUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "location_unavailable",
                Some(msg.clone()),
            ),
            AppError::Directions(msg) => {
                (StatusCode::BAD_GATEWAY, "directions_error", Some(msg.clone()))
            }
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Upstream API error");
                (StatusCode::BAD_GATEWAY, "upstream_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
