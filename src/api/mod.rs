//! API route handlers.
//!
//! # Responsibilities
//! - Declare the gates each endpoint needs
//! - Call the backend (or compute locally) and shape the `data` payload
//! - Translate backend statuses into the codes a route promises
//!
//! # Design Decisions
//! - A route only lists the statuses it treats specially; everything else
//!   goes through `From<BackendError> for ApiError`
//! - Request bodies are typed structs; what is forwarded is the validated
//!   value re-serialized, not the raw bytes

pub mod auth;
pub mod bills;
pub mod groups;
pub mod health;
pub mod notifications;
pub mod proposals;
pub mod recurring;
pub mod wallet;

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, Request},
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::security::RateScope;

/// Every `/api` route. Paths are relative to the `/api` nest point.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // === Auth ===
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/oauth/{provider}", get(auth::oauth_url))
        // === Groups ===
        .route("/groups", get(groups::list).post(groups::create))
        .route(
            "/groups/{id}",
            get(groups::get_one).patch(groups::update).delete(groups::remove),
        )
        .route("/groups/{id}/members", get(groups::members).post(groups::add_member))
        .route("/groups/{id}/members/{member_id}", delete(groups::remove_member))
        .route("/groups/{id}/invite", post(groups::invite))
        .route("/invites/{code}/accept", post(groups::accept_invite))
        // === Bills ===
        .route("/groups/{id}/bills", get(bills::list).post(bills::create))
        .route(
            "/bills/{id}",
            get(bills::get_one).patch(bills::update).delete(bills::remove),
        )
        // === Proposals ===
        .route("/groups/{id}/proposals", get(proposals::list).post(proposals::create))
        .route("/proposals/{id}/vote", post(proposals::vote))
        // === Wallet & ledger ===
        .route("/groups/{id}/transactions", get(wallet::transactions))
        .route("/groups/{id}/wallet", get(wallet::group_wallet))
        .route("/groups/{id}/budget-categories", get(wallet::budget_categories))
        .route("/wallet/config", get(wallet::config))
        .route("/wallet/session", post(wallet::session))
        // === Recurring bills ===
        .route(
            "/groups/{id}/recurring-bills",
            get(recurring::list).post(recurring::create),
        )
        .route("/recurring-bills/next-due-date", post(recurring::next_due_date))
        // === Notifications ===
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", patch(notifications::mark_read))
        .method_not_allowed_fallback(method_not_allowed)
}

/// Known path, unsupported method. `OPTIONS` is answered by the CORS gate
/// before this error is reached.
async fn method_not_allowed(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("unmatched", RateScope::Default)
        .run(request, |_ctx| async { Err::<(), _>(ApiError::MethodNotAllowed) })
        .await
}

/// Path parameters that never reject. A segment axum cannot decode (bad
/// percent-encoding, invalid UTF-8) comes through as `T::default()`, so the
/// route's own gates turn it into an enveloped error.
#[derive(Debug)]
pub struct LenientPath<T>(pub T);

impl<S, T> FromRequestParts<S> for LenientPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(path = %parts.uri.path(), error = %rejection, "Undecodable path parameter");
                Ok(Self(T::default()))
            }
        }
    }
}

/// Serialize a validated request for forwarding.
pub(crate) fn to_json<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(format!("failed to encode body: {e}")))
}

/// Append a query string to a backend path when there is one.
pub(crate) fn with_query(path: String, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path,
    }
}
