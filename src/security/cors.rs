//! Cross-origin resource sharing policy.
//!
//! # Responsibilities
//! - Translate `CorsConfig` into a `tower_http` CORS layer
//! - Answer preflight (`OPTIONS`) requests without touching later stages
//! - Decorate ordinary responses with the CORS headers
//!
//! # Design Decisions
//! - The header logic is `tower_http::cors`; the pipeline only decides when
//!   it runs, so preflight stays ahead of rate limiting
//! - An empty origin list means the frontend origin only
//! - A wildcard origin never goes out with credentials

use std::convert::Infallible;
use std::future::{ready, Ready};
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode},
};
use thiserror::Error;
use tower::{service_fn, util::ServiceFn, Layer, ServiceExt};
use tower_http::cors::{AllowOrigin, Cors, CorsLayer};
use url::Url;

use crate::config::CorsConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorsError {
    #[error("cors.allowed_origins: \"*\" cannot be combined with allow_credentials")]
    WildcardWithCredentials,

    #[error("cors: invalid {kind} {value:?}")]
    Invalid { kind: &'static str, value: String },
}

type Blank = fn(Request<Body>) -> Ready<Result<Response<Body>, Infallible>>;

fn blank(_request: Request<Body>) -> Ready<Result<Response<Body>, Infallible>> {
    ready(Ok(Response::new(Body::empty())))
}

/// A configured `Cors` service wrapped around an empty responder. Running a
/// request head through it yields exactly the CORS headers for that request.
#[derive(Clone)]
pub struct CorsPolicy {
    service: Cors<ServiceFn<Blank>>,
}

impl std::fmt::Debug for CorsPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorsPolicy").finish_non_exhaustive()
    }
}

impl CorsPolicy {
    /// Build the policy. `frontend_url` supplies the origin when the config
    /// lists none.
    pub fn from_config(config: &CorsConfig, frontend_url: &str) -> Result<Self, CorsError> {
        let layer = Self::layer(config, frontend_url)?;
        Ok(Self {
            service: layer.layer(service_fn(blank as Blank)),
        })
    }

    /// The `tower_http` layer described by `config`.
    pub fn layer(config: &CorsConfig, frontend_url: &str) -> Result<CorsLayer, CorsError> {
        let wildcard = config.allowed_origins.iter().any(|o| o.trim() == "*");
        if wildcard && config.allow_credentials {
            return Err(CorsError::WildcardWithCredentials);
        }

        let origin = if wildcard {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(allowed_origins(config, frontend_url)?)
        };

        let methods = config
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().as_bytes()).map_err(|_| CorsError::Invalid {
                    kind: "method",
                    value: m.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let headers = config
            .allowed_headers
            .iter()
            .map(|h| {
                HeaderName::from_bytes(h.trim().as_bytes()).map_err(|_| CorsError::Invalid {
                    kind: "header",
                    value: h.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(config.allow_credentials)
            .max_age(Duration::from_secs(config.max_age_secs)))
    }

    /// Every `OPTIONS` request is treated as a preflight.
    pub fn is_preflight(method: &Method) -> bool {
        method == Method::OPTIONS
    }

    async fn headers_for(&self, method: &Method, request_headers: &HeaderMap) -> HeaderMap {
        let mut request = Request::new(Body::empty());
        *request.method_mut() = method.clone();
        *request.headers_mut() = request_headers.clone();
        match self.service.clone().oneshot(request).await {
            Ok(response) => response.into_parts().0.headers,
            Err(never) => match never {},
        }
    }

    /// Add CORS headers to a response headed back to the requester.
    pub async fn apply(&self, method: &Method, request_headers: &HeaderMap, response_headers: &mut HeaderMap) {
        let cors = self.headers_for(method, request_headers).await;
        response_headers.extend(cors);
    }

    /// Answer a preflight request.
    pub async fn preflight(&self, request_headers: &HeaderMap) -> Response<Body> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        *response.headers_mut() = self.headers_for(&Method::OPTIONS, request_headers).await;
        response
    }
}

fn allowed_origins(config: &CorsConfig, frontend_url: &str) -> Result<Vec<HeaderValue>, CorsError> {
    let listed: Vec<&str> = config
        .allowed_origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .collect();

    let origins = if listed.is_empty() {
        vec![frontend_url]
    } else {
        listed
    };

    origins
        .into_iter()
        .map(|value| {
            let invalid = || CorsError::Invalid {
                kind: "origin",
                value: value.to_string(),
            };
            let origin = Url::parse(value).map_err(|_| invalid())?.origin();
            if !origin.is_tuple() {
                return Err(invalid());
            }
            HeaderValue::from_str(&origin.ascii_serialization()).map_err(|_| invalid())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    const FRONTEND: &str = "https://roomy.app";

    fn origin(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::ORIGIN, HeaderValue::from_str(value).unwrap());
        h
    }

    async fn allow_origin(policy: &CorsPolicy, request: &HeaderMap) -> Option<HeaderValue> {
        let mut out = HeaderMap::new();
        policy.apply(&Method::GET, request, &mut out).await;
        out.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).cloned()
    }

    #[test]
    fn test_wildcard_with_credentials_is_refused() {
        let config = CorsConfig {
            allowed_origins: vec!["*".into()],
            ..CorsConfig::default()
        };
        assert_eq!(
            CorsPolicy::from_config(&config, FRONTEND).unwrap_err(),
            CorsError::WildcardWithCredentials
        );
    }

    #[tokio::test]
    async fn test_default_allows_only_the_frontend() {
        let policy = CorsPolicy::from_config(&CorsConfig::default(), "https://roomy.app/app/").unwrap();

        assert_eq!(allow_origin(&policy, &origin(FRONTEND)).await.unwrap(), FRONTEND);
        assert!(allow_origin(&policy, &origin("https://evil.example")).await.is_none());
        assert!(allow_origin(&policy, &HeaderMap::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_wildcard_without_credentials() {
        let policy = CorsPolicy::from_config(
            &CorsConfig {
                allowed_origins: vec!["*".into()],
                allow_credentials: false,
                ..CorsConfig::default()
            },
            FRONTEND,
        )
        .unwrap();
        assert_eq!(allow_origin(&policy, &origin("https://a.example")).await.unwrap(), "*");
    }

    #[tokio::test]
    async fn test_explicit_origin_list() {
        let policy = CorsPolicy::from_config(
            &CorsConfig {
                allowed_origins: vec!["https://admin.roomy.app/".into()],
                ..CorsConfig::default()
            },
            FRONTEND,
        )
        .unwrap();
        assert!(allow_origin(&policy, &origin("https://admin.roomy.app")).await.is_some());
        assert!(allow_origin(&policy, &origin(FRONTEND)).await.is_none());
    }

    #[test]
    fn test_bad_entries_are_reported() {
        let config = CorsConfig {
            allowed_methods: vec!["GE T".into()],
            ..CorsConfig::default()
        };
        assert!(matches!(
            CorsPolicy::from_config(&config, FRONTEND),
            Err(CorsError::Invalid { kind: "method", .. })
        ));
        assert!(matches!(
            CorsPolicy::from_config(&CorsConfig::default(), "not a url"),
            Err(CorsError::Invalid { kind: "origin", .. })
        ));
    }

    #[tokio::test]
    async fn test_preflight_response() {
        let policy = CorsPolicy::from_config(&CorsConfig::default(), FRONTEND).unwrap();
        let response = policy.preflight(&origin(FRONTEND)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let h = response.headers();
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], FRONTEND);
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(h[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("PATCH"));
        assert_eq!(h[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
