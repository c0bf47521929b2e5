//! Error types for the gateway.
//!
//! Every failure a request can hit ends up as an [`ApiError`], which knows its
//! HTTP status and machine-readable code and renders itself as the error
//! envelope.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::http::response::{ErrorBody, FieldErrors};
use crate::upstream::BackendError;

/// Result alias used by handlers and gates.
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway error type.
#[derive(Debug, Error)]
pub enum ApiError {
    // === Client Errors ===
    #[error("Invalid JSON in request body")]
    InvalidJson,

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Invalid {param}")]
    InvalidId { param: String },

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    // === Server Errors ===
    #[error("Internal server error")]
    Internal(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("Service temporarily unavailable")]
    Unavailable(String),
}

impl ApiError {
    /// 401 with the generic `UNAUTHORIZED` code.
    pub fn unauthorized() -> Self {
        Self::Unauthorized {
            code: "UNAUTHORIZED",
            message: "Authentication required".to_string(),
        }
    }

    pub fn unauthorized_with(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson
            | Self::Validation(_)
            | Self::InvalidId { .. }
            | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJson | Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidId { .. } => "INVALID_ID",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::BadRequest { code, .. }
            | Self::Unauthorized { code, .. }
            | Self::Forbidden { code, .. }
            | Self::NotFound { code, .. }
            | Self::Conflict { code, .. } => *code,
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        match &self {
            Self::Internal(detail) | Self::Unavailable(detail) => {
                tracing::error!(code = code, detail = %detail, "Server error occurred");
            }
            _ => tracing::debug!(error = %self, code = code, "Client error occurred"),
        }

        let retry_after = match &self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let message = self.to_string();
        let errors = match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        };

        let mut response = (status, Json(ErrorBody::new(message, Some(code), errors))).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

// === From implementations ===

/// Default translation of backend failures, used when a route has no more
/// specific rule for the status it got.
impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, message } => match status {
                StatusCode::BAD_REQUEST => Self::bad_request("BAD_REQUEST", message),
                StatusCode::UNAUTHORIZED => Self::unauthorized_with("UNAUTHORIZED", message),
                StatusCode::FORBIDDEN => Self::forbidden("FORBIDDEN", message),
                StatusCode::NOT_FOUND => Self::not_found("NOT_FOUND", message),
                StatusCode::CONFLICT => Self::conflict("CONFLICT", message),
                StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { retry_after_secs: 60 },
                _ => Self::Internal(format!("backend returned {status}: {message}")),
            },
            BackendError::Unavailable(detail) => Self::Unavailable(detail),
            BackendError::Decode(detail) => Self::Internal(format!("undecodable backend body: {detail}")),
            BackendError::Request(detail) => Self::Internal(detail),
        }
    }
}
