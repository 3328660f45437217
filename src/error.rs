//! Request-path error taxonomy and classification.
//!
//! # Responsibilities
//! - Name every way a proxied request can fail
//! - Map each failure to exactly one client-visible status and message
//! - Render failures as plain-text responses
//!
//! # Classification order
//! 1. Authorization failure → 401, fixed message
//! 2. Errors carrying their own status/message (malformed URL, media type) → as-is
//! 3. Upstream HTTP errors → upstream status and status text, verbatim
//! 4. Everything else → 500, generic message

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body sent with every 401.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized image proxy access";

/// Body sent for network failures and anything unexpected.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while downloading your image.";

/// Errors that can terminate a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The authorizer rejected the request.
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,

    /// The path segment did not decode to an absolute http(s) URL.
    #[error("Malformed target URL: {0}")]
    MalformedUrl(String),

    /// Upstream answered 2xx with a content type outside the allow-list.
    #[error("Unsupported Media Type, expected {accepted}, received {received}")]
    UnsupportedMediaType { accepted: String, received: String },

    /// Upstream answered with a non-2xx status.
    #[error("HTTP Error Response: {}", status_line(.status, .status_text))]
    UpstreamStatus {
        status: StatusCode,
        status_text: String,
    },

    /// Upstream could not be reached (DNS, connect, TLS, timeout).
    #[error("Upstream request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream sent no response head before the deadline.
    #[error("Upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    /// Anything that does not fit the categories above.
    #[error("Unexpected failure: {0}")]
    Unknown(String),
}

fn status_line(status: &StatusCode, status_text: &str) -> String {
    format!("{} {}", status.as_u16(), status_text)
}

/// Coarse failure category, used for logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    MalformedUrl,
    UnsupportedMediaType,
    UpstreamHttpError,
    NetworkFailure,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::MalformedUrl => "malformed_url",
            ErrorKind::UnsupportedMediaType => "unsupported_media_type",
            ErrorKind::UpstreamHttpError => "upstream_http_error",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl ProxyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::Unauthorized => ErrorKind::Unauthorized,
            ProxyError::MalformedUrl(_) => ErrorKind::MalformedUrl,
            ProxyError::UnsupportedMediaType { .. } => ErrorKind::UnsupportedMediaType,
            ProxyError::UpstreamStatus { .. } => ErrorKind::UpstreamHttpError,
            ProxyError::Network(_) | ProxyError::UpstreamTimeout(_) => ErrorKind::NetworkFailure,
            ProxyError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Status code and body the client receives for this failure.
    pub fn classify(&self) -> (StatusCode, String) {
        match self {
            ProxyError::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE.to_string()),
            ProxyError::MalformedUrl(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ProxyError::UnsupportedMediaType { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, self.to_string())
            }
            ProxyError::UpstreamStatus { status, status_text } => (*status, status_text.clone()),
            ProxyError::Network(_) | ProxyError::UpstreamTimeout(_) | ProxyError::Unknown(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_FAILURE_MESSAGE.to_string(),
            ),
        }
    }

    /// Client errors are logged at warn, the rest at error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Unauthorized | ErrorKind::MalformedUrl | ErrorKind::UnsupportedMediaType
        )
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = self.classify();
        (status, message).into_response()
    }
}
