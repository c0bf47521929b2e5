//! Backend HTTP client.
//!
//! # Responsibilities
//! - Build the outbound URL from the configured base and a request path
//! - Attach the caller's bearer token and request id
//! - Relay the JSON body of 2xx responses
//! - Turn non-2xx responses and network failures into typed errors
//!
//! # Design Decisions
//! - One best-effort attempt per call: no retries, no circuit breaking
//! - No timeout unless `backend.timeout_secs` is configured
//! - The backend status travels as a `StatusCode` field so callers can
//!   match on it instead of on message text

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::config::BackendConfig;
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("Backend error {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Connection refused, DNS failure or a configured timeout.
    #[error("Backend unreachable: {0}")]
    Unavailable(String),

    /// The backend answered 2xx with a body that is not JSON.
    #[error("Invalid backend response: {0}")]
    Decode(String),

    /// The request could not be built or sent for another reason.
    #[error("Backend request failed: {0}")]
    Request(String),
}

impl BackendError {
    /// The backend's HTTP status, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Client for the backend service. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl BackendClient {
    /// Create a client from configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a backend path. The base path segment is preserved.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Bind a bearer token and request id for a series of calls.
    pub fn authorized<'a>(&'a self, token: Option<&'a str>, request_id: Option<&'a str>) -> Upstream<'a> {
        Upstream {
            client: self,
            token,
            request_id,
        }
    }

    /// Perform one call and return the parsed JSON body.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<Value, BackendError> {
        let start = Instant::now();
        let url = self.url_for(path);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(id) = request_id {
            request = request.header(X_REQUEST_ID, id);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(method = %method, url = %url, "Calling backend");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(method = %method, url = %url, error = %e, "Backend call failed");
                metrics::record_backend_call(method.as_str(), "error", start);
                return Err(BackendError::from_transport(e));
            }
        };

        let status = response.status();
        metrics::record_backend_call(method.as_str(), status.as_str(), start);

        let bytes = response.bytes().await.map_err(BackendError::from_transport)?;

        if !status.is_success() {
            let message = error_message(&bytes, status);
            tracing::info!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                message = %message,
                "Backend returned error status"
            );
            return Err(BackendError::Status { status, message });
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Pull a human message out of a backend error body, falling back to the
/// status reason phrase.
fn error_message(bytes: &[u8], status: StatusCode) -> String {
    let from_body = serde_json::from_slice::<Value>(bytes).ok().and_then(|v| {
        ["message", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    from_body.unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string())
}

/// A [`BackendClient`] bound to one caller's credentials.
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    client: &'a BackendClient,
    token: Option<&'a str>,
    request_id: Option<&'a str>,
}

impl Upstream<'_> {
    pub async fn get(&self, path: &str) -> Result<Value, BackendError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, BackendError> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, BackendError> {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, BackendError> {
        self.client
            .send(method, path, body, self.token, self.request_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: base.to_string(),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_keeps_base_path() {
        let c = client("http://localhost:3001/api/");
        assert_eq!(c.url_for("/auth/login"), "http://localhost:3001/api/auth/login");
        assert_eq!(c.url_for("groups?page=2"), "http://localhost:3001/api/groups?page=2");
    }

    #[test]
    fn test_error_message_prefers_body() {
        let msg = error_message(br#"{"message":"Email not registered"}"#, StatusCode::NOT_FOUND);
        assert_eq!(msg, "Email not registered");

        let msg = error_message(br#"{"error":"nope"}"#, StatusCode::FORBIDDEN);
        assert_eq!(msg, "nope");

        let msg = error_message(b"<html>", StatusCode::BAD_GATEWAY);
        assert_eq!(msg, "Bad Gateway");
    }

    #[test]
    fn test_status_error_display_embeds_code() {
        let err = BackendError::Status {
            status: StatusCode::NOT_FOUND,
            message: "missing".into(),
        };
        assert_eq!(err.to_string(), "Backend error 404 Not Found: missing");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // Port 9 (discard) is not listening on loopback in test environments.
        let c = client("http://127.0.0.1:9/api");
        let err = c.send(Method::GET, "/health", None, None, None).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)), "{err:?}");
    }
}
