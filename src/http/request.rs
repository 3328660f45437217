//! Request handling: request IDs and target URL extraction.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Decode the path-embedded target URL exactly once
//! - Reject targets that are not absolute http(s) URLs
//!
//! # Design Decisions
//! - The raw, still-encoded path segment is decoded here, not by the router,
//!   so a target containing its own escapes (`%20`, `%2F`) survives intact
//! - Request ID added as early as possible for tracing

use axum::{
    extract::{FromRequestParts, RawPathParams},
    http::{request::Parts, HeaderMap, HeaderName, HeaderValue, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

use crate::error::ProxyError;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID for logging, or `unknown` outside the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Percent-decode a raw path segment into an absolute http(s) URL.
pub fn decode_target(raw: &str) -> Result<Url, ProxyError> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| ProxyError::MalformedUrl("target is not valid UTF-8".to_string()))?;

    let url = Url::parse(&decoded).map_err(|e| ProxyError::MalformedUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ProxyError::MalformedUrl(format!(
                "unsupported scheme '{}'",
                other
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ProxyError::MalformedUrl("target has no host".to_string()));
    }

    Ok(url)
}

/// Extractor for the decoded target of `/{target}`.
#[derive(Debug, Clone)]
pub struct TargetUrl(pub Url);

impl<S> FromRequestParts<S> for TargetUrl
where
    S: Send + Sync,
{
    type Rejection = ProxyError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = RawPathParams::from_request_parts(parts, state)
            .await
            .map_err(|e| ProxyError::MalformedUrl(e.body_text()))?;

        let raw = params
            .iter()
            .next()
            .map(|(_, value)| value)
            .ok_or_else(|| ProxyError::MalformedUrl("missing target".to_string()))?;

        decode_target(raw).map(TargetUrl)
    }
}
