//! Per-request state handed from gate to gate and on to the route callback.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use axum::{
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, Uri},
};
use futures_util::StreamExt;

use crate::error::{ApiError, ApiResult};
use crate::http::request::request_id;
use crate::security::{client_identifier, extract_token};
use crate::upstream::{BackendClient, Upstream};

pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    client_id: String,
    request_id: Option<String>,
    token: Option<String>,
    // Body is Send but not Sync; the mutex lets `&RequestContext` cross awaits.
    body: Mutex<Option<Body>>,
    max_body_size: usize,
    validated: Option<Box<dyn Any + Send + Sync>>,
}

impl RequestContext {
    pub fn from_request(request: Request<Body>, max_body_size: usize) -> Self {
        let (parts, body) = request.into_parts();
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let request_id = request_id(&parts.headers).map(str::to_string);

        Self {
            client_id: client_identifier(peer, &parts.headers),
            token: extract_token(&parts.headers),
            request_id,
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: Mutex::new(Some(body)),
            max_body_size,
            validated: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Rate-limit bucket identifier for this client.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Bearer token from header or cookie, if the request carried one.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Token or `401 UNAUTHORIZED`.
    pub fn require_token(&self) -> ApiResult<&str> {
        self.token().ok_or_else(ApiError::unauthorized)
    }

    /// Backend client bound to this request's token and request id.
    pub fn upstream<'a>(&'a self, client: &'a BackendClient) -> Upstream<'a> {
        client.authorized(self.token(), self.request_id())
    }

    /// Read the raw body, at most `max_body_size` bytes. The body can only
    /// be read once. A transport failure mid-body is a 400, not a 413.
    pub async fn read_body(&mut self) -> ApiResult<Bytes> {
        let limit = self.max_body_size;
        let body = self
            .body
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| ApiError::Internal("request body already consumed".to_string()))?;

        let mut stream = body.into_data_stream();
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::debug!(error = %e, "Failed to read request body");
                ApiError::bad_request("INVALID_BODY", "Failed to read request body")
            })?;
            if buf.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }

    pub(crate) fn set_body<T: Send + Sync + 'static>(&mut self, value: T) {
        self.validated = Some(Box::new(value));
    }

    /// Take the validated body declared with `Pipeline::validate::<T>()`.
    pub fn body<T: Send + Sync + 'static>(&mut self) -> ApiResult<T> {
        match self.validated.take().map(|b| b.downcast::<T>()) {
            Some(Ok(value)) => Ok(*value),
            Some(Err(other)) => {
                self.validated = Some(other);
                Err(ApiError::Internal(format!(
                    "validated body is not a {}",
                    std::any::type_name::<T>()
                )))
            }
            None => Err(ApiError::Internal(format!(
                "no validated {} for this route",
                std::any::type_name::<T>()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(request: Request<Body>) -> RequestContext {
        RequestContext::from_request(request, 16)
    }

    #[tokio::test]
    async fn test_body_can_be_read_once() {
        let mut c = ctx(Request::new(Body::from("{}")));
        assert_eq!(c.read_body().await.unwrap(), Bytes::from("{}"));
        assert!(c.read_body().await.is_err());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut c = ctx(Request::new(Body::from("x".repeat(17))));
        let err = c.read_body().await.unwrap_err();
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_body_exactly_at_limit() {
        let mut c = ctx(Request::new(Body::from("x".repeat(16))));
        assert_eq!(c.read_body().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_broken_body_is_bad_request_not_413() {
        let chunks = futures_util::stream::iter(vec![
            Ok(Bytes::from("{\"a\"")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer went away")),
        ]);
        let mut c = ctx(Request::new(Body::from_stream(chunks)));

        let err = c.read_body().await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_BODY");
    }

    #[test]
    fn test_typed_body_roundtrip() {
        let mut c = ctx(Request::new(Body::empty()));
        assert!(c.body::<String>().is_err());

        c.set_body(42u32);
        assert!(c.body::<String>().is_err());
        assert_eq!(c.body::<u32>().unwrap(), 42);
    }

    #[test]
    fn test_peer_address_from_connect_info() {
        let mut request = Request::new(Body::empty());
        let addr: SocketAddr = "192.0.2.10:4000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(ctx(request).client_id(), "192.0.2.10");
    }
}
