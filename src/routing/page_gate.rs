//! Redirects for browser page paths.
//!
//! Pages themselves are rendered elsewhere; this gate only decides where a
//! browser should go based on whether it holds a session cookie.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::http::server::AppState;
use crate::routing::matcher::{any_matches, PathMatcher};
use crate::security::token::AUTH_COOKIE;
use crate::security::RateScope;

pub const LOGIN_PATH: &str = "/auth/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

const PROTECTED_PREFIXES: [&str; 7] = [
    "/dashboard",
    "/groups",
    "/bills",
    "/proposals",
    "/wallet",
    "/notifications",
    "/settings",
];

/// What the gate decided for a page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDecision {
    Allow,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct PageGate {
    protected: Vec<PathMatcher>,
    public_only: Vec<PathMatcher>,
}

impl Default for PageGate {
    fn default() -> Self {
        Self {
            protected: PROTECTED_PREFIXES.iter().map(|p| PathMatcher::prefix(*p)).collect(),
            public_only: vec![PathMatcher::exact("/"), PathMatcher::prefix("/auth")],
        }
    }
}

impl PageGate {
    pub fn decide(&self, path: &str, authenticated: bool) -> PageDecision {
        if !authenticated && any_matches(&self.protected, path) {
            let target: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
            return PageDecision::Redirect(format!("{LOGIN_PATH}?redirect={target}"));
        }
        if authenticated && any_matches(&self.public_only, path) {
            return PageDecision::Redirect(DASHBOARD_PATH.to_string());
        }
        PageDecision::Allow
    }
}

fn has_session_cookie(headers: &HeaderMap) -> bool {
    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .is_some_and(|c| !c.value().trim().is_empty())
}

/// Fallback for every path no route claimed.
///
/// Unknown `/api` paths get a `404 NOT_FOUND` envelope (still through the
/// CORS and rate-limit gates). Other paths go through the page gate.
pub async fn fallback(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    if path == "/api" || path.starts_with("/api/") {
        return state
            .endpoint("unmatched", RateScope::Default)
            .run(request, |_ctx| async move {
                Err::<(), _>(ApiError::not_found("NOT_FOUND", format!("Route {path} not found")))
            })
            .await;
    }

    let authenticated = has_session_cookie(request.headers());
    match state.page_gate.decide(&path, authenticated) {
        PageDecision::Redirect(to) => {
            tracing::debug!(from = %path, to = %to, "Page redirect");
            Redirect::temporary(&to).into_response()
        }
        PageDecision::Allow => ApiError::not_found("NOT_FOUND", "Page not found").into_response(),
    }
}
