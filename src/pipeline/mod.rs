//! Handler composition.
//!
//! # Responsibilities
//! - Collect the gates an endpoint declares (CORS, rate limit, validation, auth)
//! - Run them in a fixed order, stopping at the first one that answers or fails
//! - Run the route callback and turn its result into a response
//!
//! # Design Decisions
//! - Order comes from each gate's [`Stage`], not from declaration order. The
//!   driver sorts once (stable) and then walks the list
//! - Only gates that let the request through get to decorate the response,
//!   so a preflight answer is never decorated twice
//! - Validated bodies are typed: `validate::<T>()` on the builder,
//!   `ctx.body::<T>()` in the callback
//!
//! # Data Flow
//! ```text
//! Request ──► RequestContext ──► [Cors] ► [RateLimit] ► [Validation] ► [Auth] ──► callback
//!                                   │          │             │            │           │
//!                                   └──────────┴─────────────┴────────────┴───────────┴──► Response
//! ```

pub mod context;
pub mod gate;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::config::RateRule;
use crate::error::ApiResult;
use crate::observability::metrics;
use crate::security::{CorsPolicy, RateLimiter, RateScope};

pub use context::RequestContext;
pub use gate::{AuthGate, BodyGate, CorsGate, Flow, Gate, RateLimitGate, Stage, UuidParamsGate};

/// Body cap used when the builder is not given one.
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// The gates for one endpoint plus the driver that runs them.
pub struct Pipeline {
    route: &'static str,
    gates: Vec<Box<dyn Gate>>,
    max_body_size: usize,
}

impl Pipeline {
    /// `route` is the route template, used as a metrics label.
    pub fn new(route: &'static str) -> Self {
        Self {
            route,
            gates: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    pub fn gate(mut self, gate: impl Gate + 'static) -> Self {
        self.gates.push(Box::new(gate));
        self
    }

    pub fn cors(self, policy: Arc<CorsPolicy>) -> Self {
        self.gate(CorsGate::new(policy))
    }

    pub fn rate_limit(self, limiter: RateLimiter, scope: RateScope, rule: RateRule) -> Self {
        self.gate(RateLimitGate::new(limiter, scope, rule))
    }

    /// Parse and validate the body as `T` before the callback runs.
    pub fn validate<T>(self) -> Self
    where
        T: DeserializeOwned + Validate + Send + Sync + 'static,
    {
        self.gate(BodyGate::<T>::new())
    }

    /// Require `value` to be a UUID, reported as `name` when it is not.
    pub fn uuid_param(self, name: &'static str, value: impl Into<String>) -> Self {
        self.gate(UuidParamsGate::new(vec![(name, value.into())]))
    }

    pub fn require_auth(self) -> Self {
        self.gate(AuthGate)
    }

    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    pub fn route(&self) -> &'static str {
        self.route
    }

    /// Stages in the order the driver will run them.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self.gates.iter().map(|g| g.stage()).collect();
        stages.sort();
        stages
    }

    /// Drive `request` through the gates and then `handler`.
    pub async fn run<F, Fut, R>(mut self, request: Request<Body>, handler: F) -> Response
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = ApiResult<R>>,
        R: IntoResponse,
    {
        let start = Instant::now();
        self.gates.sort_by_key(|g| g.stage());

        let mut ctx = RequestContext::from_request(request, self.max_body_size);
        let method = ctx.method().clone();
        let request_headers = ctx.headers().clone();

        let mut passed = 0;
        let mut early = None;
        for gate in &self.gates {
            match gate.check(&mut ctx).await {
                Ok(Flow::Continue) => passed += 1,
                Ok(Flow::Respond(response)) => {
                    early = Some(response);
                    break;
                }
                Err(err) => {
                    tracing::debug!(
                        route = self.route,
                        gate = gate.name(),
                        code = err.error_code(),
                        "Request stopped at gate"
                    );
                    early = Some(err.into_response());
                    break;
                }
            }
        }

        let mut response = match early {
            Some(response) => response,
            None => handler(ctx).await.into_response(),
        };

        for gate in &self.gates[..passed] {
            gate.decorate(&method, &request_headers, &mut response).await;
        }

        metrics::record_request(method.as_str(), self.route, response.status().as_u16(), start);
        response
    }
}
