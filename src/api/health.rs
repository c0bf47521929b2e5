//! Liveness endpoint.

use axum::{body::Body, extract::State, http::Request, response::Response};
use serde::Serialize;

use crate::error::ApiError;
use crate::http::{response::Success, server::AppState};
use crate::security::RateScope;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`. Answers locally; the backend is not probed.
pub async fn health(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/health", RateScope::Default)
        .run(request, |_ctx| async {
            Ok::<_, ApiError>(Success::ok(HealthStatus {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
            }))
        })
        .await
}
