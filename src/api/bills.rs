//! Bill endpoints.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::api::{to_json, with_query, LenientPath};
use crate::error::ApiError;
use crate::http::{response::Success, server::AppState};
use crate::security::RateScope;
use crate::upstream::{unwrap_field, BackendError};
use crate::validation::Pagination;

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 0.01, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64))]
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.01, message = "Amount must be greater than zero"))]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

fn bill_error(e: BackendError) -> ApiError {
    match e.status() {
        Some(StatusCode::NOT_FOUND) => ApiError::not_found("BILL_NOT_FOUND", "Bill not found"),
        _ => e.into(),
    }
}

/// `GET /api/groups/{id}/bills?page&limit`
pub async fn list(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/bills", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let page = Pagination::from_query(ctx.query())?;
            let path = with_query(format!("/groups/{id}/bills"), Some(&page.to_query()));
            let body = ctx.upstream(&state.backend).get(&path).await?;
            Ok::<_, ApiError>(Success::ok(unwrap_field(body, "bills")))
        })
        .await
}

/// `POST /api/groups/{id}/bills`
pub async fn create(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/bills", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .validate::<CreateBillRequest>()
        .run(request, |mut ctx| async move {
            let body: CreateBillRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .post(&format!("/groups/{id}/bills"), &to_json(&body)?)
                .await?;
            Ok::<_, ApiError>(Success::created(data).with_message("Bill created successfully"))
        })
        .await
}

/// `GET /api/bills/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/bills/{id}", RateScope::Default)
        .require_auth()
        .uuid_param("billId", id.as_str())
        .run(request, |ctx| async move {
            let data = ctx
                .upstream(&state.backend)
                .get(&format!("/bills/{id}"))
                .await
                .map_err(bill_error)?;
            Ok::<_, ApiError>(Success::ok(data))
        })
        .await
}

/// `PATCH /api/bills/{id}`
pub async fn update(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/bills/{id}", RateScope::Default)
        .require_auth()
        .uuid_param("billId", id.as_str())
        .validate::<UpdateBillRequest>()
        .run(request, |mut ctx| async move {
            let body: UpdateBillRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .patch(&format!("/bills/{id}"), &to_json(&body)?)
                .await
                .map_err(bill_error)?;
            Ok::<_, ApiError>(Success::ok(data).with_message("Bill updated successfully"))
        })
        .await
}

/// `DELETE /api/bills/{id}`
pub async fn remove(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/bills/{id}", RateScope::Default)
        .require_auth()
        .uuid_param("billId", id.as_str())
        .run(request, |ctx| async move {
            ctx.upstream(&state.backend)
                .delete(&format!("/bills/{id}"))
                .await
                .map_err(bill_error)?;
            Ok::<_, ApiError>(Success::ok(Value::Null).with_message("Bill deleted successfully"))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse_body;

    #[test]
    fn test_create_bill_rules() {
        let err = parse_body::<CreateBillRequest>(br#"{"title":"","amount":0}"#).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.contains_key("title"));
                assert_eq!(errors["amount"], vec!["Amount must be greater than zero".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_optional_fields_not_forwarded_when_absent() {
        let bill: CreateBillRequest =
            parse_body(br#"{"title":"Rent","amount":1200.5,"dueDate":"2026-11-01"}"#).unwrap();
        let json = to_json(&bill).unwrap();
        assert_eq!(json["dueDate"], "2026-11-01");
        assert!(json.get("description").is_none());
    }
}
