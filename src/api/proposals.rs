//! Payment proposals and voting.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::api::{to_json, LenientPath};
use crate::error::ApiError;
use crate::http::{response::Success, server::AppState};
use crate::security::RateScope;
use crate::upstream::unwrap_field;

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0.01, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 128))]
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[validate(custom(function = "validate_vote"))]
    pub vote: String,
}

fn validate_vote(vote: &str) -> Result<(), ValidationError> {
    match vote {
        "approve" | "reject" => Ok(()),
        _ => {
            let mut err = ValidationError::new("vote");
            err.message = Some("Vote must be approve or reject".into());
            Err(err)
        }
    }
}

/// `GET /api/groups/{id}/proposals`
pub async fn list(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/proposals", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let body = ctx.upstream(&state.backend).get(&format!("/groups/{id}/proposals")).await?;
            Ok::<_, ApiError>(Success::ok(unwrap_field(body, "proposals")))
        })
        .await
}

/// `POST /api/groups/{id}/proposals`
pub async fn create(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/proposals", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .validate::<CreateProposalRequest>()
        .run(request, |mut ctx| async move {
            let body: CreateProposalRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .post(&format!("/groups/{id}/proposals"), &to_json(&body)?)
                .await?;
            Ok::<_, ApiError>(Success::created(data).with_message("Proposal created successfully"))
        })
        .await
}

/// `POST /api/proposals/{id}/vote`
pub async fn vote(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/proposals/{id}/vote", RateScope::Default)
        .require_auth()
        .uuid_param("proposalId", id.as_str())
        .validate::<VoteRequest>()
        .run(request, |mut ctx| async move {
            let body: VoteRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .post(&format!("/proposals/{id}/vote"), &to_json(&body)?)
                .await
                .map_err(|e| match e.status() {
                    Some(StatusCode::NOT_FOUND) => ApiError::not_found("PROPOSAL_NOT_FOUND", "Proposal not found"),
                    Some(StatusCode::CONFLICT) => {
                        ApiError::conflict("ALREADY_VOTED", "You have already voted on this proposal")
                    }
                    _ => e.into(),
                })?;
            tracing::info!(proposal_id = %id, vote = %body.vote, "Vote recorded");
            Ok::<_, ApiError>(Success::ok(data).with_message("Vote recorded"))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse_body;

    #[test]
    fn test_vote_values() {
        assert!(parse_body::<VoteRequest>(br#"{"vote":"approve"}"#).is_ok());
        assert!(parse_body::<VoteRequest>(br#"{"vote":"reject"}"#).is_ok());

        match parse_body::<VoteRequest>(br#"{"vote":"abstain"}"#) {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors["vote"], vec!["Vote must be approve or reject".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
