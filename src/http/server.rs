//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the API table and the page fallback
//! - Wire up middleware (request ID, tracing, panic capture)
//! - Bind the server to a listener and drain on shutdown
//!
//! # Design Decisions
//! - Per-endpoint concerns (CORS, rate limit, validation, auth) live in the
//!   pipeline, not in tower layers, so each route states its own gates
//! - A panicking handler still produces the standard error envelope

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::api;
use crate::config::GatewayConfig;
use crate::error::ApiError;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::shutdown;
use crate::pipeline::Pipeline;
use crate::routing::{page_gate, PageGate};
use crate::security::{CorsError, CorsPolicy, RateLimiter, RateScope};
use crate::upstream::{BackendClient, BackendError};

/// Failure to assemble the shared application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("backend client error: {0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Cors(#[from] CorsError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub backend: BackendClient,
    pub limiter: RateLimiter,
    pub cors: Arc<CorsPolicy>,
    pub page_gate: Arc<PageGate>,
}

impl AppState {
    /// State with an in-memory rate-limit store.
    pub fn new(config: GatewayConfig) -> Result<Self, StateError> {
        Self::with_limiter(config, RateLimiter::in_memory())
    }

    pub fn with_limiter(config: GatewayConfig, limiter: RateLimiter) -> Result<Self, StateError> {
        Ok(Self {
            backend: BackendClient::new(&config.backend)?,
            cors: Arc::new(CorsPolicy::from_config(&config.cors, &config.links.frontend_url)?),
            page_gate: Arc::new(PageGate::default()),
            limiter,
            config: Arc::new(config),
        })
    }

    /// A pipeline carrying the gates every API endpoint shares: CORS and the
    /// `scope` rate limit, each when enabled.
    pub fn endpoint(&self, route: &'static str, scope: RateScope) -> Pipeline {
        let mut pipeline = Pipeline::new(route).max_body_size(self.config.security.max_body_size);
        if self.config.cors.enabled {
            pipeline = pipeline.cors(self.cors.clone());
        }
        if self.config.rate_limit.enabled {
            pipeline = pipeline.rate_limit(self.limiter.clone(), scope, scope.rule(&self.config.rate_limit));
        }
        pipeline
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, StateError> {
        Ok(Self::from_state(AppState::new(config)?))
    }

    pub fn from_state(state: AppState) -> Self {
        let config = state.config.clone();
        Self {
            router: build_router(state),
            config,
        }
    }

    /// The fully layered router, e.g. for driving requests in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.base_url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api::routes())
        .fallback(page_gate::fallback)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer())
                .layer(CatchPanicLayer::custom(panic_response)),
        )
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
