//! Path and query parameter checks.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ApiError, ApiResult};

// Valid static pattern, cannot fail.
#[allow(clippy::unwrap_used)]
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .unwrap()
});

/// Hyphenated RFC 4122 UUID, versions 1-5, either case.
pub fn is_valid_uuid(value: &str) -> bool {
    UUID_RE.is_match(value)
}

/// `INVALID_ID` unless `value` is a UUID.
pub fn require_uuid(param: &str, value: &str) -> ApiResult<()> {
    if is_valid_uuid(value) {
        Ok(())
    } else {
        Err(ApiError::InvalidId {
            param: param.to_string(),
        })
    }
}

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// Page/limit pair for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Read `page` and `limit` from a raw query string. Other keys are ignored.
    pub fn from_query(query: Option<&str>) -> ApiResult<Self> {
        let mut pagination = Self::default();
        let Some(query) = query else {
            return Ok(pagination);
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "page" => {
                    pagination.page = parse_bounded(&value, 1, u32::MAX)
                        .ok_or_else(|| invalid("page must be a positive integer"))?;
                }
                "limit" => {
                    pagination.limit = parse_bounded(&value, 1, MAX_LIMIT)
                        .ok_or_else(|| invalid("limit must be between 1 and 100"))?;
                }
                _ => {}
            }
        }
        Ok(pagination)
    }

    /// Query string to forward to the backend.
    pub fn to_query(&self) -> String {
        format!("page={}&limit={}", self.page, self.limit)
    }
}

fn parse_bounded(value: &str, min: u32, max: u32) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|n| (min..=max).contains(n))
}

fn invalid(message: &str) -> ApiError {
    ApiError::bad_request("INVALID_PAGINATION", message)
}
