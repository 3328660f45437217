//! Upstream response validation.
//!
//! Only metadata is inspected; the body stays unread so a rejected
//! response never leaks a byte to the client.

use axum::http::StatusCode;

use crate::config::ValidationConfig;
use crate::error::ProxyError;
use crate::upstream::fetcher::UpstreamResponse;

/// Status and content-type gate applied before anything is forwarded.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    allowed: Vec<String>,
    allow_missing: bool,
}

impl ResponseValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            allowed: config
                .allowed_content_types
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            allow_missing: config.allow_missing_content_type,
        }
    }

    /// Pass the response through untouched, or say why it cannot be forwarded.
    pub fn validate(&self, upstream: UpstreamResponse) -> Result<UpstreamResponse, ProxyError> {
        self.check(
            upstream.status(),
            &upstream.status_text(),
            upstream.content_type().as_deref(),
        )?;
        Ok(upstream)
    }

    /// The decision itself, on plain metadata.
    pub fn check(
        &self,
        status: StatusCode,
        status_text: &str,
        content_type: Option<&str>,
    ) -> Result<(), ProxyError> {
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus {
                status,
                status_text: status_text.to_string(),
            });
        }

        match content_type {
            None if self.allow_missing => Ok(()),
            None => Err(self.unsupported("none")),
            Some(received) => {
                let received = received.to_ascii_lowercase();
                if self.allowed.iter().any(|t| *t == received) {
                    Ok(())
                } else {
                    Err(self.unsupported(&received))
                }
            }
        }
    }

    fn unsupported(&self, received: &str) -> ProxyError {
        ProxyError::UnsupportedMediaType {
            accepted: self.allowed.join(", "),
            received: received.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn validator() -> ResponseValidator {
        ResponseValidator::new(&ValidationConfig::default())
    }

    #[test]
    fn test_accepts_every_default_type() {
        let v = validator();
        for t in ["image/jpg", "image/jpeg", "image/png", "image/webp", "image/svg+xml"] {
            assert!(v.check(StatusCode::OK, "OK", Some(t)).is_ok(), "{} rejected", t);
        }
        assert!(v.check(StatusCode::OK, "OK", Some("IMAGE/WEBP")).is_ok());
    }

    #[test]
    fn test_rejects_html_with_descriptive_message() {
        let err = validator()
            .check(StatusCode::OK, "OK", Some("text/html"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedMediaType);
        assert_eq!(
            err.to_string(),
            "Unsupported Media Type, expected image/jpg, image/jpeg, image/png, image/webp, image/svg+xml, received text/html"
        );
    }

    #[test]
    fn test_parameters_are_not_stripped() {
        // Matching is exact; a charset suffix makes it a different type.
        assert!(validator()
            .check(StatusCode::OK, "OK", Some("image/png; charset=binary"))
            .is_err());
    }

    #[test]
    fn test_non_success_status_wins_over_content_type() {
        let err = validator()
            .check(StatusCode::NOT_FOUND, "Not Found", Some("image/png"))
            .unwrap_err();
        match err {
            ProxyError::UpstreamStatus { status, status_text } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(status_text, "Not Found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_content_type_policy() {
        let err = validator().check(StatusCode::OK, "OK", None).unwrap_err();
        assert!(err.to_string().ends_with("received none"));

        let lenient = ResponseValidator::new(&ValidationConfig {
            allow_missing_content_type: true,
            ..ValidationConfig::default()
        });
        assert!(lenient.check(StatusCode::OK, "OK", None).is_ok());
        // Present-but-wrong types are still rejected
        assert!(lenient.check(StatusCode::OK, "OK", Some("text/plain")).is_err());
    }

    #[test]
    fn test_validate_keeps_response_intact() {
        let http = axum::http::Response::builder()
            .status(200)
            .header("content-type", "image/png")
            .body("png")
            .unwrap();
        let upstream = UpstreamResponse::new(reqwest::Response::from(http));
        let passed = validator().validate(upstream).unwrap();
        assert_eq!(passed.status(), StatusCode::OK);
        assert_eq!(passed.content_type().as_deref(), Some("image/png"));
    }
}
