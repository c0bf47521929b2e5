//! Gates: the individual checks a request passes before its route callback.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::{HeaderMap, Method},
    response::Response,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::config::RateRule;
use crate::error::{ApiError, ApiResult};
use crate::observability::metrics;
use crate::pipeline::context::RequestContext;
use crate::security::{CorsPolicy, RateDecision, RateLimiter, RateScope};
use crate::validation::{parse_body, require_uuid};

/// Position of a gate in the pipeline. Gates run in ascending stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Cors,
    RateLimit,
    Validation,
    Auth,
}

/// What a gate decided.
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next gate.
    Continue,
    /// Answer now; later gates and the callback never run.
    Respond(Response),
}

#[async_trait]
pub trait Gate: Send + Sync {
    fn stage(&self) -> Stage;

    /// Short label for logs.
    fn name(&self) -> &'static str;

    async fn check(&self, ctx: &mut RequestContext) -> ApiResult<Flow>;

    /// Adjust the final response. Only called on gates that continued.
    async fn decorate(&self, _method: &Method, _request_headers: &HeaderMap, _response: &mut Response) {}
}

/// Preflight short-circuit and CORS response headers.
pub struct CorsGate {
    policy: Arc<CorsPolicy>,
}

impl CorsGate {
    pub fn new(policy: Arc<CorsPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Gate for CorsGate {
    fn stage(&self) -> Stage {
        Stage::Cors
    }

    fn name(&self) -> &'static str {
        "cors"
    }

    async fn check(&self, ctx: &mut RequestContext) -> ApiResult<Flow> {
        if CorsPolicy::is_preflight(ctx.method()) {
            return Ok(Flow::Respond(self.policy.preflight(ctx.headers()).await));
        }
        Ok(Flow::Continue)
    }

    async fn decorate(&self, method: &Method, request_headers: &HeaderMap, response: &mut Response) {
        self.policy.apply(method, request_headers, response.headers_mut()).await;
    }
}

/// Per-client quota.
pub struct RateLimitGate {
    limiter: RateLimiter,
    scope: RateScope,
    rule: RateRule,
}

impl RateLimitGate {
    pub fn new(limiter: RateLimiter, scope: RateScope, rule: RateRule) -> Self {
        Self { limiter, scope, rule }
    }
}

#[async_trait]
impl Gate for RateLimitGate {
    fn stage(&self) -> Stage {
        Stage::RateLimit
    }

    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn check(&self, ctx: &mut RequestContext) -> ApiResult<Flow> {
        let decision = self
            .limiter
            .check(self.scope.as_str(), ctx.client_id(), self.rule)
            .await;

        match decision {
            RateDecision::Allowed { .. } => Ok(Flow::Continue),
            RateDecision::Limited { .. } => {
                tracing::warn!(
                    client = %ctx.client_id(),
                    scope = self.scope.as_str(),
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited(self.scope.as_str());
                Err(ApiError::RateLimited {
                    retry_after_secs: decision.retry_after_secs(),
                })
            }
        }
    }
}

/// UUID checks on path parameters.
pub struct UuidParamsGate {
    params: Vec<(&'static str, String)>,
}

impl UuidParamsGate {
    pub fn new(params: Vec<(&'static str, String)>) -> Self {
        Self { params }
    }
}

#[async_trait]
impl Gate for UuidParamsGate {
    fn stage(&self) -> Stage {
        Stage::Validation
    }

    fn name(&self) -> &'static str {
        "uuid_params"
    }

    async fn check(&self, _ctx: &mut RequestContext) -> ApiResult<Flow> {
        for (name, value) in &self.params {
            require_uuid(name, value)?;
        }
        Ok(Flow::Continue)
    }
}

/// Parses the body as `T` and stores it for the callback.
pub struct BodyGate<T> {
    _shape: PhantomData<fn() -> T>,
}

impl<T> BodyGate<T> {
    pub fn new() -> Self {
        Self { _shape: PhantomData }
    }
}

impl<T> Default for BodyGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Gate for BodyGate<T>
where
    T: DeserializeOwned + Validate + Send + Sync + 'static,
{
    fn stage(&self) -> Stage {
        Stage::Validation
    }

    fn name(&self) -> &'static str {
        "body"
    }

    async fn check(&self, ctx: &mut RequestContext) -> ApiResult<Flow> {
        let bytes = ctx.read_body().await?;
        let data: T = parse_body(&bytes)?;
        ctx.set_body(data);
        Ok(Flow::Continue)
    }
}

/// Requires a bearer token. Validity is left to the backend.
pub struct AuthGate;

#[async_trait]
impl Gate for AuthGate {
    fn stage(&self) -> Stage {
        Stage::Auth
    }

    fn name(&self) -> &'static str {
        "auth"
    }

    async fn check(&self, ctx: &mut RequestContext) -> ApiResult<Flow> {
        ctx.require_token()?;
        Ok(Flow::Continue)
    }
}
