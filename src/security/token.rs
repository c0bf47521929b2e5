//! Credential extraction and the auth cookie contract.
//!
//! The access token travels either as `Authorization: Bearer <token>` or in
//! the `auth_token` cookie; the header wins when both are present. The
//! refresh token only ever travels in the `refresh_token` cookie or in a
//! request body.

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const AUTH_COOKIE: &str = "auth_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Bearer token from the `Authorization` header, else the `auth_token`
/// cookie. Never fails; malformed or empty credentials count as absent.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer(headers).or_else(|| cookie_value(headers, AUTH_COOKIE))
}

/// Refresh token from the `refresh_token` cookie.
pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, REFRESH_COOKIE)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookies that establish a browser session.
pub fn session_cookies(token: &str, refresh_token: Option<&str>, secure: bool) -> CookieJar {
    let jar = CookieJar::new().add(session_cookie(AUTH_COOKIE, token.to_string(), secure));
    match refresh_token {
        Some(refresh) => jar.add(session_cookie(REFRESH_COOKIE, refresh.to_string(), secure)),
        None => jar,
    }
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new(), secure);
    cookie.make_removal();
    cookie
}

/// Removal cookies for both session cookies. They are added, not removed,
/// because a fresh jar only emits cookies in its delta.
pub fn clear_session_cookies(secure: bool) -> CookieJar {
    CookieJar::new()
        .add(removal_cookie(AUTH_COOKIE, secure))
        .add(removal_cookie(REFRESH_COOKIE, secure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let h = headers(&[
            (header::AUTHORIZATION, "Bearer from-header"),
            (header::COOKIE, "auth_token=from-cookie"),
        ]);
        assert_eq!(extract_token(&h).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_cookie_fallback() {
        let h = headers(&[(header::COOKIE, "theme=dark; auth_token=abc.def")]);
        assert_eq!(extract_token(&h).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_non_bearer_header_falls_through() {
        let h = headers(&[
            (header::AUTHORIZATION, "Basic dXNlcjpwYXNz"),
            (header::COOKIE, "auth_token=abc"),
        ]);
        assert_eq!(extract_token(&h).as_deref(), Some("abc"));

        let h = headers(&[(header::AUTHORIZATION, "Bearer ")]);
        assert_eq!(extract_token(&h), None);
    }

    #[test]
    fn test_absent() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        let h = headers(&[(header::COOKIE, "auth_token=")]);
        assert_eq!(extract_token(&h), None);
    }

    #[test]
    fn test_refresh_cookie() {
        let h = headers(&[(header::COOKIE, "refresh_token=r1; auth_token=a1")]);
        assert_eq!(extract_refresh_token(&h).as_deref(), Some("r1"));
    }

    #[test]
    fn test_clear_session_cookies_emits_removals() {
        use axum::response::IntoResponse;

        let response = clear_session_cookies(false).into_response();
        let set: Vec<&str> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();

        assert_eq!(set.len(), 2);
        for name in [AUTH_COOKIE, REFRESH_COOKIE] {
            let cookie = set.iter().find(|c| c.starts_with(&format!("{name}="))).unwrap();
            assert!(cookie.contains("Max-Age=0"), "{cookie}");
            assert!(cookie.contains("Path=/"), "{cookie}");
            assert!(cookie.contains("HttpOnly"), "{cookie}");
        }
    }

    #[test]
    fn test_session_cookie_attributes() {
        let jar = session_cookies("tok", Some("ref"), true);
        let auth = jar.get(AUTH_COOKIE).unwrap();
        assert_eq!(auth.value(), "tok");
        assert_eq!(auth.http_only(), Some(true));
        assert_eq!(auth.secure(), Some(true));
        assert_eq!(auth.path(), Some("/"));
        assert_eq!(jar.get(REFRESH_COOKIE).unwrap().value(), "ref");
    }
}
