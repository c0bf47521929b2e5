//! Response envelope.
//!
//! # Responsibilities
//! - Wrap every result in `{success: true, data, message?, timestamp}`
//! - Wrap every error in `{success: false, error, code?, errors?, timestamp}`
//! - Stamp each envelope with an RFC 3339 UTC timestamp
//!
//! # Design Decisions
//! - One place owns the wire shape; handlers never build JSON envelopes
//! - Timestamps use millisecond precision and a `Z` suffix

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Field path → messages, as produced by body validation.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Current time in the envelope's timestamp format.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Success envelope body.
#[derive(Debug, Serialize)]
pub struct SuccessBody<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

/// Error envelope body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    pub timestamp: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: Option<&str>, errors: Option<FieldErrors>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.map(str::to_string),
            errors,
            timestamp: timestamp(),
        }
    }
}

/// A successful handler result: status, payload and optional message.
#[derive(Debug)]
pub struct Success<T: Serialize> {
    pub status: StatusCode,
    pub data: T,
    pub message: Option<String>,
}

impl<T: Serialize> Success<T> {
    /// 200 OK.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
            message: None,
        }
    }

    /// 201 Created.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        let body = SuccessBody {
            success: true,
            data: self.data,
            message: self.message,
            timestamp: timestamp(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'), "{ts}");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        // 2026-10-16T08:30:00.000Z
        assert_eq!(ts.len(), 24);
    }

    #[test]
    fn test_success_body_omits_missing_message() {
        let body = SuccessBody {
            success: true,
            data: json!([1, 2]),
            message: None,
            timestamp: timestamp(),
        };
        let value: Value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], json!([1, 2]));
        assert!(value.get("message").is_none());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_error_body_shape() {
        let mut errors = FieldErrors::new();
        errors.insert("email".into(), vec!["Invalid email address".into()]);
        let value = serde_json::to_value(ErrorBody::new(
            "Validation failed",
            Some("VALIDATION_ERROR"),
            Some(errors),
        ))
        .unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["code"], "VALIDATION_ERROR");
        assert_eq!(value["errors"]["email"][0], "Invalid email address");
    }

    #[test]
    fn test_success_status() {
        let response = Success::created(json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
