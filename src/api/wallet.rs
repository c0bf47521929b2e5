//! Wallet, ledger and budget endpoints.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
};
use serde::Serialize;

use crate::api::{with_query, LenientPath};
use crate::error::ApiError;
use crate::http::{response::Success, server::AppState};
use crate::security::RateScope;
use crate::upstream::unwrap_field;
use crate::validation::Pagination;

/// Public wallet settings for the browser. Never includes the secret key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSettings {
    pub publishable_key: String,
    pub chain_id: u64,
}

/// `GET /api/groups/{id}/transactions?page&limit`
pub async fn transactions(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/transactions", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let page = Pagination::from_query(ctx.query())?;
            let path = with_query(format!("/groups/{id}/transactions"), Some(&page.to_query()));
            let body = ctx.upstream(&state.backend).get(&path).await?;
            Ok::<_, ApiError>(Success::ok(unwrap_field(body, "transactions")))
        })
        .await
}

/// `GET /api/groups/{id}/wallet`
pub async fn group_wallet(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/wallet", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let data = ctx
                .upstream(&state.backend)
                .get(&format!("/groups/{id}/wallet"))
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::NOT_FOUND) => ApiError::not_found("WALLET_NOT_FOUND", "Wallet not found"),
                    _ => e.into(),
                })?;
            Ok::<_, ApiError>(Success::ok(data))
        })
        .await
}

/// `GET /api/groups/{id}/budget-categories`
pub async fn budget_categories(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/budget-categories", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let body = ctx
                .upstream(&state.backend)
                .get(&format!("/groups/{id}/budget-categories"))
                .await?;
            Ok::<_, ApiError>(Success::ok(unwrap_field(body, "categories")))
        })
        .await
}

/// `GET /api/wallet/config`
pub async fn config(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/wallet/config", RateScope::Default)
        .run(request, |_ctx| async move {
            let wallet = &state.config.wallet;
            Ok::<_, ApiError>(Success::ok(WalletSettings {
                publishable_key: wallet.publishable_key.clone(),
                chain_id: wallet.chain_id,
            }))
        })
        .await
}

/// `POST /api/wallet/session`. Embedded-wallet sessions are not issued by
/// this service.
pub async fn session(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/wallet/session", RateScope::Default)
        .require_auth()
        .run(request, |_ctx| async {
            Err::<Success<()>, _>(ApiError::NotImplemented(
                "Wallet sessions are not available yet".to_string(),
            ))
        })
        .await
}
