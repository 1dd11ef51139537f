//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses with appropriate status codes.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quill_core::{StoreError, ValidationError};
use serde_json::json;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request body or query string (400)
    BadRequest { message: String },

    /// Input failed validation (422)
    Validation(ValidationError),

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// No route matches the path (404)
    RouteNotFound,

    /// Route exists but not for this method (405)
    MethodNotAllowed,

    /// Stored version moved on since the client read it (409)
    EditConflict { id: i64 },

    /// Client exhausted its rate limit (429)
    RateLimited,

    /// Store call exceeded its deadline (504)
    Timeout { after: Duration },

    /// Internal error (500, logged)
    Internal { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "bad_request",
                    "message": message
                }),
            ),
            Self::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": "validation_error",
                    "field": e.field(),
                    "message": e.to_string()
                }),
            ),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": format!("{} '{}' not found", resource, id)
                }),
            ),
            Self::RouteNotFound => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": "the requested resource could not be found"
                }),
            ),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({
                    "error": "method_not_allowed",
                    "message": "the method is not supported for this resource"
                }),
            ),
            Self::EditConflict { id } => {
                tracing::warn!(id, "edit conflict");
                (
                    StatusCode::CONFLICT,
                    json!({
                        "error": "edit_conflict",
                        "message": "unable to update the record due to an edit conflict, please try again"
                    }),
                )
            }
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "rate_limited",
                    "message": "rate limit exceeded"
                }),
            ),
            Self::Timeout { after } => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({
                    "error": "timeout",
                    "message": format!("operation timed out after {} ms", after.as_millis())
                }),
            ),
            Self::Internal { message } => {
                // Log the actual error, return generic message
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "the server encountered a problem and could not process your request"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id } => Self::NotFound {
                resource: "comment",
                id: id.to_string(),
            },
            StoreError::EditConflict { id } => Self::EditConflict { id },
            StoreError::Timeout { after } => Self::Timeout { after },
            StoreError::Backend { message } => Self::Internal { message },
        }
    }
}
