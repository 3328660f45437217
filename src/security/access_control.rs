//! Access Control Middleware.
//! Decides whether a request may reach the upstream fetch.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::config::{AuthConfig, AuthMode};
use crate::error::ProxyError;
use crate::http::request::request_id;
use crate::observability::metrics;

/// Query parameter carrying the caller's token.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// A pluggable authorization policy.
///
/// The middleware consults exactly one implementation per request, so a
/// deployment can swap policies without touching routing.
pub trait Authorizer: Send + Sync + std::fmt::Debug {
    /// Returns true if the request carrying these query parameters may proceed.
    fn authorize(&self, query: &HashMap<String, String>) -> bool;
}

/// Allows requests whose `access_token` equals a fixed secret.
///
/// Comparison is exact and case-sensitive, and runs in time independent of
/// how many leading bytes match.
#[derive(Clone)]
pub struct SharedSecret {
    secret: String,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret").finish_non_exhaustive()
    }
}

impl Authorizer for SharedSecret {
    fn authorize(&self, query: &HashMap<String, String>) -> bool {
        query
            .get(ACCESS_TOKEN_PARAM)
            .is_some_and(|token| {
                !self.secret.is_empty()
                    && bool::from(token.as_bytes().ct_eq(self.secret.as_bytes()))
            })
    }
}

/// Allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl Authorizer for OpenAccess {
    fn authorize(&self, _query: &HashMap<String, String>) -> bool {
        true
    }
}

/// Build the policy selected by configuration.
pub fn authorizer_from_config(config: &AuthConfig) -> Arc<dyn Authorizer> {
    match config.mode {
        AuthMode::SharedSecret => Arc::new(SharedSecret::new(
            config.access_token.clone().unwrap_or_default(),
        )),
        AuthMode::Open => {
            tracing::warn!("Authorization disabled: the proxy is usable by anyone who can reach it");
            Arc::new(OpenAccess)
        }
    }
}

/// Decode a raw query string. Repeated keys keep their last value.
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Reject unauthorized requests before the handler (and the network) is reached.
pub async fn access_control_middleware(
    State(authorizer): State<Arc<dyn Authorizer>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let query = parse_query(request.uri().query());

    if authorizer.authorize(&query) {
        return next.run(request).await;
    }

    tracing::warn!(
        request_id = %request_id(request.headers()),
        token_present = query.contains_key(ACCESS_TOKEN_PARAM),
        "Unauthorized image proxy access"
    );
    metrics::record_auth_rejection();
    ProxyError::Unauthorized.into_response()
}
