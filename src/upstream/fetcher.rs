//! Outbound fetch of the target image.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use futures_util::Stream;
use reqwest::{redirect, Client};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;

/// Pooled HTTP client used for every upstream fetch.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamFetcher {
    client: Client,
    head_timeout: Duration,
}

impl UpstreamFetcher {
    /// Build the client: fixed User-Agent, bounded redirects, connect and idle-read timeouts.
    ///
    /// The response-head deadline is applied per fetch; once headers are in, the
    /// body is bounded only by the idle read timeout.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            head_timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// GET `url`. Resolves once response headers arrive; the body is left unread.
    pub async fn fetch(&self, url: &Url) -> Result<UpstreamResponse, ProxyError> {
        let response = tokio::time::timeout(self.head_timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| ProxyError::UpstreamTimeout(self.head_timeout))??;

        tracing::debug!(
            url = %url,
            final_url = %response.url(),
            status = %response.status(),
            "Upstream responded"
        );

        Ok(UpstreamResponse::new(response))
    }
}

/// Upstream response whose body has not been consumed yet.
#[derive(Debug)]
pub struct UpstreamResponse {
    inner: reqwest::Response,
}

impl UpstreamResponse {
    pub fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// True for any 2xx status.
    pub fn status_ok(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Reason phrase as sent by the upstream, falling back to the canonical one.
    pub fn status_text(&self) -> String {
        self.inner
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
            .or_else(|| self.status().canonical_reason())
            .unwrap_or_default()
            .to_string()
    }

    /// Lowercased `Content-Type`, if present and valid ASCII.
    pub fn content_type(&self) -> Option<String> {
        self.inner
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    /// Consume the response into its single-pass body stream.
    pub fn into_body_stream(self) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send {
        self.inner.bytes_stream()
    }
}
