//! Recurring bills and the next-due-date calculator.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::api::{to_json, LenientPath};
use crate::error::{ApiError, ApiResult};
use crate::http::{response::Success, server::AppState};
use crate::schedule::{next_due, Frequency, Occurrence};
use crate::security::RateScope;
use crate::upstream::unwrap_field;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecurringBillRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 0.01, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[validate(custom(function = "validate_frequency"))]
    pub frequency: String,
    #[validate(custom(function = "validate_date"))]
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_date"))]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NextDueDateRequest {
    #[validate(custom(function = "validate_frequency"))]
    pub frequency: String,
    #[validate(custom(function = "validate_date"))]
    pub start_date: String,
    #[serde(default)]
    #[validate(custom(function = "validate_date"))]
    pub reference_date: Option<String>,
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_frequency(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Frequency>()
        .map(|_| ())
        .map_err(|_| rule_error("frequency", "Frequency must be one of daily, weekly, biweekly, monthly, quarterly, yearly"))
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    parse_date(value)
        .map(|_| ())
        .ok_or_else(|| rule_error("date", "Date must be formatted as YYYY-MM-DD"))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

impl NextDueDateRequest {
    /// Compute the answer. `today` stands in for a missing reference date.
    pub fn resolve(&self, today: NaiveDate) -> ApiResult<Occurrence> {
        let frequency: Frequency = self
            .frequency
            .parse()
            .map_err(|e| ApiError::Internal(format!("unvalidated frequency: {e}")))?;
        let start = parse_date(&self.start_date)
            .ok_or_else(|| ApiError::Internal("unvalidated start date".to_string()))?;
        let reference = match &self.reference_date {
            Some(date) => parse_date(date)
                .ok_or_else(|| ApiError::Internal("unvalidated reference date".to_string()))?,
            None => today,
        };

        next_due(start, frequency, reference)
            .ok_or_else(|| ApiError::bad_request("INVALID_SCHEDULE", "Schedule runs past the supported date range"))
    }
}

/// `GET /api/groups/{id}/recurring-bills`
pub async fn list(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/recurring-bills", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .run(request, |ctx| async move {
            let body = ctx
                .upstream(&state.backend)
                .get(&format!("/groups/{id}/recurring-bills"))
                .await?;
            Ok::<_, ApiError>(Success::ok(unwrap_field(body, "recurringBills")))
        })
        .await
}

/// `POST /api/groups/{id}/recurring-bills`
pub async fn create(
    State(state): State<AppState>,
    LenientPath(id): LenientPath<String>,
    request: Request<Body>,
) -> Response {
    state
        .endpoint("/api/groups/{id}/recurring-bills", RateScope::Default)
        .require_auth()
        .uuid_param("groupId", id.as_str())
        .validate::<CreateRecurringBillRequest>()
        .run(request, |mut ctx| async move {
            let body: CreateRecurringBillRequest = ctx.body()?;
            let data = ctx
                .upstream(&state.backend)
                .post(&format!("/groups/{id}/recurring-bills"), &to_json(&body)?)
                .await?;
            Ok::<_, ApiError>(Success::created(data).with_message("Recurring bill created successfully"))
        })
        .await
}

/// `POST /api/recurring-bills/next-due-date`
pub async fn next_due_date(State(state): State<AppState>, request: Request<Body>) -> Response {
    state
        .endpoint("/api/recurring-bills/next-due-date", RateScope::Default)
        .require_auth()
        .validate::<NextDueDateRequest>()
        .run(request, |mut ctx| async move {
            let body: NextDueDateRequest = ctx.body()?;
            let occurrence = body.resolve(Utc::now().date_naive())?;
            Ok::<_, ApiError>(Success::ok(occurrence))
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse_body;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_resolve_defaults_reference_to_today() {
        let req: NextDueDateRequest =
            parse_body(br#"{"frequency":"weekly","startDate":"2026-10-01"}"#).unwrap();
        let occurrence = req.resolve(today()).unwrap();
        assert_eq!(occurrence.next_due_date.to_string(), "2026-10-22");
        assert_eq!(occurrence.occurrence, 3);
    }

    #[test]
    fn test_resolve_with_reference() {
        let req: NextDueDateRequest = parse_body(
            br#"{"frequency":"monthly","startDate":"2024-01-31","referenceDate":"2024-02-10"}"#,
        )
        .unwrap();
        let json = serde_json::to_value(req.resolve(today()).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "nextDueDate": "2024-02-29", "occurrence": 1 }));
    }

    #[test]
    fn test_bad_frequency_and_date_are_field_errors() {
        let err = parse_body::<NextDueDateRequest>(br#"{"frequency":"hourly","startDate":"10/01/2026"}"#)
            .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert!(errors.contains_key("frequency"));
                assert_eq!(errors["startDate"], vec!["Date must be formatted as YYYY-MM-DD".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
