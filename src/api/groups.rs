//! Group, membership and invite endpoints.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::api::{to_json, LenientPath};
use crate::error::ApiError;
use crate::http::{response::Success, server::AppState};
use crate::security::RateScope;
use crate::upstream::{unwrap_field, BackendError};

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

fn group_error(e: BackendError) -> ApiError {
    match e.status() {
        Some(StatusCode::NOT_FOUND) => ApiError::not_found("GROUP_NOT_FOUND", "Group not found"),
        Some(StatusCode::FORBIDDEN) => {
            ApiError::forbidden("FORBIDDEN", "You do not have access to this group")
        }
        _ => e.into(),
    }
}

/// Adds the shareable `link` to an invite payload.
pub fn with_invite_link(mut data: Value, app_url: &str) -> Value {
    let code = data.get("code").and_then(Value::as_str).map(str::to_string);
    if let (Some(code), Some(map)) = (code, data.as_object_mut()) {
        let link = format!("{}/invite/{}", app_url.trim_end_matches('/'), code);
        map.insert("link".to_string(), Value::String(link));
    }
    data
}

/// `GET /api/groups`
pub async fn list(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/groups", RateScope::Default)
        .require_auth()
        .run(request, |ctx| async move {
            let body = ctx.upstream(&state.backend).get("/groups").await?;
            Ok::<_, ApiError>(Success::ok(unwrap_field(body, "groups")))
        })
        .await
}

/// `POST /api/groups`
pub async fn create(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/groups", RateScope::Default)
        .require_auth()
        .validate::<CreateGroupRequest>()
        .run(request, |mut ctx| async move {
            let body: CreateGroupRequest = ctx.body()?;
            let data = ctx.upstream(&state.backend).post("/groups", &to_json(&body)?).await?;
            tracing::info!(name = %body.name, "Group created");
            Ok::<_, ApiError>(Success::created(data).with_message("Group created successfully"))
        })
        .await
}

/// `GET /api/groups/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let data = ctx
                .upstream(&state.backend)
                .get(&format!("/groups/{id}"))
                .await
                .map_err(group_error)?;
            Ok::<_, ApiError>(Success::ok(data))
        })
        .await
}

/// `PATCH /api/groups/{id}`
pub async fn update(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .validate::<UpdateGroupRequest>()
        .run(request, |mut ctx| async move {
            let body: UpdateGroupRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .patch(&format!("/groups/{id}"), &to_json(&body)?)
                .await
                .map_err(group_error)?;
            Ok::<_, ApiError>(Success::ok(data).with_message("Group updated successfully"))
        })
        .await
}

/// `DELETE /api/groups/{id}`
pub async fn remove(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            ctx.upstream(&state.backend)
                .delete(&format!("/groups/{id}"))
                .await
                .map_err(group_error)?;
            tracing::info!(group_id = %id, "Group deleted");
            Ok::<_, ApiError>(Success::ok(Value::Null).with_message("Group deleted successfully"))
        })
        .await
}

/// `GET /api/groups/{id}/members`
pub async fn members(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/members", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let body = ctx.upstream(&state.backend).get(&format!("/groups/{id}/members")).await?;
            Ok::<_, ApiError>(Success::ok(unwrap_field(body, "members")))
        })
        .await
}

/// `POST /api/groups/{id}/members`
pub async fn add_member(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/members", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .validate::<AddMemberRequest>()
        .run(request, |mut ctx| async move {
            let body: AddMemberRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .post(&format!("/groups/{id}/members"), &to_json(&body)?)
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::CONFLICT) => {
                        ApiError::conflict("ALREADY_MEMBER", "User is already a member of this group")
                    }
                    _ => e.into(),
                })?;
            Ok::<_, ApiError>(Success::created(data).with_message("Member added successfully"))
        })
        .await
}

/// `DELETE /api/groups/{id}/members/{member_id}`
pub async fn remove_member(
    State(state): State<AppState>,
    LenientPath((id, member_id)): LenientPath<(String, String)>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/members/{member_id}", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .uuid_param("memberId", member_id.as_str())
        .run(request, |ctx| async move {
            ctx.upstream(&state.backend)
                .delete(&format!("/groups/{id}/members/{member_id}"))
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::NOT_FOUND) => ApiError::not_found("MEMBER_NOT_FOUND", "Member not found"),
                    _ => e.into(),
                })?;
            Ok::<_, ApiError>(Success::ok(Value::Null).with_message("Member removed successfully"))
        })
        .await
}

/// `POST /api/groups/{id}/invite`
pub async fn invite(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/invite", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let data = ctx
                .upstream(&state.backend)
                .post(&format!("/groups/{id}/invite"), &json!({}))
                .await
                .map_err(group_error)?;
            let data = with_invite_link(data, &state.config.links.app_url);
            Ok::<_, ApiError>(Success::ok(data))
        })
        .await
}

/// `POST /api/invites/{code}/accept`
pub async fn accept_invite(
    State(state): State<AppState>,
    LenientPath(code): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/invites/{code}/accept", RateScope::Default)
        .require_auth()
        .run(request, |ctx| async move {
            if code.is_empty() {
                return Err(ApiError::not_found("INVITE_NOT_FOUND", "Invite not found or expired"));
            }
            let code = url::form_urlencoded::byte_serialize(code.as_bytes()).collect::<String>();
            let data = ctx
                .upstream(&state.backend)
                .post(&format!("/invites/{code}/accept"), &json!({}))
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::NOT_FOUND) => {
                        ApiError::not_found("INVITE_NOT_FOUND", "Invite not found or expired")
                    }
                    Some(StatusCode::CONFLICT) => {
                        ApiError::conflict("ALREADY_MEMBER", "You are already a member of this group")
                    }
                    _ => e.into(),
                })?;
            Ok::<_, ApiError>(Success::ok(data).with_message("Joined group successfully"))
        })
        .await
}
