//! Authentication endpoints.
//!
//! Credentials are checked by the backend. This module relays them, maps the
//! backend's answers to stable error codes and keeps the `auth_token` /
//! `refresh_token` cookies in step with the session.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::api::{to_json, LenientPath};
use crate::error::ApiError;
use crate::http::{response::Success, server::AppState};
use crate::security::token::{clear_session_cookies, session_cookies};
use crate::security::{extract_refresh_token, RateScope};
use crate::upstream::BackendError;

pub const OAUTH_PROVIDERS: [&str; 2] = ["google", "github"];

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// Session cookies for a backend auth payload carrying `token` and
/// optionally `refreshToken`. Empty when there is no token.
fn cookies_for(data: &Value, secure: bool) -> CookieJar {
    let token = data.get("token").and_then(Value::as_str);
    let refresh = data.get("refreshToken").and_then(Value::as_str);
    match token {
        Some(token) => session_cookies(token, refresh, secure),
        None => CookieJar::new(),
    }
}

/// `POST /api/auth/login`
pub async fn login(State(state): State<AppState>, request: Request<Body>) -> Response {
    let secure = state.config.security.secure_cookies;
    state
        .endpoint("/api/auth/login", RateScope::Login)
        .validate::<LoginRequest>()
        .run(request, |mut ctx| async move {
            let body: LoginRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .post("/auth/login", &to_json(&body)?)
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::UNAUTHORIZED) => {
                        ApiError::unauthorized_with("INVALID_CREDENTIALS", "Invalid email or password")
                    }
                    _ => e.into(),
                })?;

            tracing::info!(request_id = ?ctx.request_id(), "User logged in");
            Ok::<_, ApiError>((cookies_for(&data, secure), Success::ok(data).with_message("Login successful")))
        })
        .await
}

/// `POST /api/auth/register`
pub async fn register(State(state): State<AppState>, request: Request<Body>) -> Response {
    let secure = state.config.security.secure_cookies;
    state
        .endpoint("/api/auth/register", RateScope::Register)
        .validate::<RegisterRequest>()
        .run(request, |mut ctx| async move {
            let body: RegisterRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .post("/auth/register", &to_json(&body)?)
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::CONFLICT) => {
                        ApiError::conflict("EMAIL_EXISTS", "An account with this email already exists")
                    }
                    _ => e.into(),
                })?;

            Ok::<_, ApiError>((
                cookies_for(&data, secure),
                Success::created(data).with_message("Account created successfully"),
            ))
        })
        .await
}

/// `POST /api/auth/logout`. Cookies are cleared even when the backend call
/// fails.
pub async fn logout(State(state): State<AppState>, request: Request<Body>) -> Response {
    let secure = state.config.security.secure_cookies;
    state
        .endpoint("/api/auth/logout", RateScope::Default)
        .require_auth()
        .run(request, |ctx| async move {
            if let Err(e) = ctx.upstream(&state.backend).post("/auth/logout", &json!({})).await {
                tracing::warn!(error = %e, "Backend logout failed, clearing session anyway");
            }
            Ok::<_, ApiError>((
                clear_session_cookies(secure),
                Success::ok(Value::Null).with_message("Logged out successfully"),
            ))
        })
        .await
}

/// `POST /api/auth/refresh`. The refresh token comes from the body or the
/// `refresh_token` cookie.
pub async fn refresh(State(state): State<AppState>, request: Request<Body>) -> Response {
    let secure = state.config.security.secure_cookies;
    state
        .endpoint("/api/auth/refresh", RateScope::Default)
        .run(request, |mut ctx| async move {
            let bytes = ctx.read_body().await?;
            let from_body = serde_json::from_slice::<RefreshRequest>(&bytes)
                .unwrap_or_default()
                .refresh_token
                .filter(|t| !t.is_empty());
            let refresh_token = from_body
                .or_else(|| extract_refresh_token(ctx.headers()))
                .ok_or_else(|| ApiError::unauthorized_with("UNAUTHORIZED", "Refresh token required"))?;

            let data = ctx
                .upstream(&state.backend)
                .post("/auth/refresh", &json!({ "refreshToken": refresh_token }))
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::UNAUTHORIZED) => {
                        ApiError::unauthorized_with("INVALID_REFRESH_TOKEN", "Invalid or expired refresh token")
                    }
                    _ => e.into(),
                })?;

            Ok::<_, ApiError>((cookies_for(&data, secure), Success::ok(data)))
        })
        .await
}

/// `GET /api/auth/me`
pub async fn me(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/auth/me", RateScope::Default)
        .require_auth()
        .run(request, |ctx| async move {
            let data = ctx.upstream(&state.backend).get("/auth/me").await?;
            Ok::<_, ApiError>(Success::ok(data))
        })
        .await
}

/// `POST /api/auth/forgot-password`
pub async fn forgot_password(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/auth/forgot-password", RateScope::ForgotPassword)
        .validate::<ForgotPasswordRequest>()
        .run(request, |mut ctx| async move {
            let body: ForgotPasswordRequest = ctx.body()?;
            ctx.upstream(&state.backend)
                .post("/auth/forgot-password", &to_json(&body)?)
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::NOT_FOUND) => {
                        ApiError::not_found("EMAIL_NOT_FOUND", "No account found with this email")
                    }
                    _ => e.into(),
                })?;

            Ok::<_, ApiError>(Success::ok(Value::Null).with_message("Password reset email sent"))
        })
        .await
}

fn reset_error(e: BackendError) -> ApiError {
    match e.status() {
        Some(StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::GONE) => {
            ApiError::bad_request("INVALID_RESET_TOKEN", "Invalid or expired reset token")
        }
        _ => e.into(),
    }
}

/// `POST /api/auth/reset-password`
pub async fn reset_password(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/auth/reset-password", RateScope::ResetPassword)
        .validate::<ResetPasswordRequest>()
        .run(request, |mut ctx| async move {
            let body: ResetPasswordRequest = ctx.body()?;
            ctx.upstream(&state.backend)
                .post("/auth/reset-password", &to_json(&body)?)
                .await
                .map_err(reset_error)?;

            Ok::<_, ApiError>(Success::ok(Value::Null).with_message("Password reset successfully"))
        })
        .await
}

/// Backend URL that starts an OAuth flow for `provider`.
pub fn oauth_start_url(backend_base: &str, frontend_url: &str, provider: &str) -> Result<String, ApiError> {
    if !OAUTH_PROVIDERS.contains(&provider) {
        return Err(ApiError::bad_request(
            "UNSUPPORTED_PROVIDER",
            format!("Unsupported OAuth provider: {provider}"),
        ));
    }
    Ok(format!(
        "{}/auth/{}?redirect_uri={}/auth/callback",
        backend_base,
        provider,
        frontend_url.trim_end_matches('/')
    ))
}

/// `GET /api/auth/oauth/{provider}`
pub async fn oauth_url(
    State(state): State<AppState>,
    LenientPath(provider): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/auth/oauth/{provider}", RateScope::Default)
        .run(request, |_ctx| async move {
            let url = oauth_start_url(state.backend.base_url(), &state.config.links.frontend_url, &provider)?;
            Ok::<_, ApiError>(Success::ok(json!({ "url": url })))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_url() {
        let url = oauth_start_url("http://localhost:3001/api", "http://localhost:3000/", "github").unwrap();
        assert_eq!(
            url,
            "http://localhost:3001/api/auth/github?redirect_uri=http://localhost:3000/auth/callback"
        );
    }

    #[test]
    fn test_oauth_rejects_unknown_provider() {
        let err = oauth_start_url("http://b", "http://f", "myspace").unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_PROVIDER");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_cookies_only_with_token() {
        let jar = cookies_for(&json!({ "token": "t1", "refreshToken": "r1" }), false);
        assert_eq!(jar.get("auth_token").map(|c| c.value()), Some("t1"));
        assert_eq!(jar.get("refresh_token").map(|c| c.value()), Some("r1"));

        let jar = cookies_for(&json!({ "user": {} }), false);
        assert!(jar.get("auth_token").is_none());
    }

    #[test]
    fn test_reset_error_mapping() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND, StatusCode::GONE] {
            let err = reset_error(BackendError::Status {
                status,
                message: "nope".into(),
            });
            assert_eq!(err.error_code(), "INVALID_RESET_TOKEN");
        }
        let err = reset_error(BackendError::Status {
            status: StatusCode::FORBIDDEN,
            message: "nope".into(),
        });
        assert_eq!(err.error_code(), "FORBIDDEN");
    }
}
