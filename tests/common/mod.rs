//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

use roomy_gateway::config::GatewayConfig;
use roomy_gateway::http::HttpServer;

pub const GROUP_ID: &str = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";
pub const BILL_ID: &str = "9b2c6f7e-1d3a-4c5b-8e9f-0a1b2c3d4e5f";

/// One request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    /// Path and query, e.g. `/api/groups?page=1`.
    pub target: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub body: Value,
}

/// A backend on an ephemeral port that answers through a closure and
/// records every call.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Start a programmable mock backend.
pub async fn start_programmable_backend<F>(respond: F) -> MockBackend
where
    F: Fn(&RecordedCall) -> (u16, Value) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let recorder = calls.clone();
    let app = Router::new().fallback(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
        let recorder = recorder.clone();
        let respond = respond.clone();
        async move {
            let call = RecordedCall {
                method,
                target: uri.path_and_query().map(|p| p.to_string()).unwrap_or_default(),
                authorization: header_string(&headers, header::AUTHORIZATION.as_str()),
                request_id: header_string(&headers, "x-request-id"),
                body: serde_json::from_slice(&body).unwrap_or(Value::Null),
            };
            let (status, payload) = respond(&call);
            recorder.lock().unwrap().push(call);
            (StatusCode::from_u16(status).unwrap(), Json(payload)).into_response()
        }
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, calls }
}

/// Start a mock backend that always returns the same answer.
pub async fn start_mock_backend(status: u16, body: Value) -> MockBackend {
    start_programmable_backend(move |_| (status, body.clone())).await
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Gateway config pointed at `backend`.
pub fn config_for(backend: &MockBackend) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backend.base_url = backend.base_url();
    config.links.frontend_url = "https://roomy.app".to_string();
    config
}

pub fn gateway(config: GatewayConfig) -> Router {
    HttpServer::new(config).unwrap().router()
}

/// Response pieces a test usually asserts on.
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, headers, body }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
