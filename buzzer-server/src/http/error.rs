//! API error type with IntoResponse
//!
//! Gateway errors are converted to `{"error": code, "message": text}` JSON
//! with the matching status code. Retryable 503s carry `Retry-After: 1`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use buzzer_core::models::ValidationError;
use buzzer_core::GatewayError;
use serde_json::json;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Failure reported by the query gateway
    Gateway(GatewayError),

    /// Request body could not be decoded (400)
    BadRequest(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message.clone()),
            Self::Gateway(err) => {
                let (status, code) = match err {
                    GatewayError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                    GatewayError::GameNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                    GatewayError::PoolExhausted { .. } => {
                        (StatusCode::SERVICE_UNAVAILABLE, "pool_exhausted")
                    }
                    GatewayError::DatabaseUnavailable => {
                        (StatusCode::SERVICE_UNAVAILABLE, "database_unavailable")
                    }
                    GatewayError::Overloaded => (StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
                    GatewayError::QueryTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                    GatewayError::Internal => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                    }
                };
                (status, code, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = code, "{}", message);
        }

        let mut response = (status, Json(json!({ "error": code, "message": message }))).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self::Gateway(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Gateway(GatewayError::Validation(e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}
