//! Notification endpoints.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
};
use serde_json::json;

use crate::api::{with_query, LenientPath};
use crate::error::ApiError;
use crate::http::{response::Success, server::AppState};
use crate::security::RateScope;
use crate::upstream::unwrap_field;

/// `GET /api/notifications`. The query string (e.g. `unread=true`) is passed
/// through.
pub async fn list(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/notifications", RateScope::Default)
        .require_auth()
        .run(request, |ctx| async move {
            let path = with_query("/notifications".to_string(), ctx.query());
            let body = ctx.upstream(&state.backend).get(&path).await?;
            Ok::<_, ApiError>(Success::ok(unwrap_field(body, "notifications")))
        })
        .await
}

/// `PATCH /api/notifications/{id}/read`
pub async fn mark_read(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/notifications/{id}/read", RateScope::Default)
        .require_auth()
        .uuid_param("notificationId", id.as_str())
        .run(request, |ctx| async move {
            let data = ctx
                .upstream(&state.backend)
                .patch(&format!("/notifications/{id}/read"), &json!({}))
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::NOT_FOUND) => {
                        ApiError::not_found("NOTIFICATION_NOT_FOUND", "Notification not found")
                    }
                    _ => e.into(),
                })?;
            Ok::<_, ApiError>(Success::ok(data))
        })
        .await
}
