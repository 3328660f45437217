//! Response handling: streaming a validated upstream body to the client.
//!
//! # Responsibilities
//! - Mirror the upstream status
//! - Carry over the upstream headers that describe the image
//! - Stream body chunks as they arrive
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body; hyper pulls the next
//!   chunk only when the client socket accepts more
//! - `Content-Length` is not copied; the server frames the stream itself
//! - An upstream error mid-body aborts the client connection instead of
//!   ending the body cleanly, so a truncated image is never mistaken for a whole one

use axum::{
    body::Body,
    http::{header, HeaderName},
    response::Response,
};
use futures_util::TryStreamExt;

use crate::upstream::UpstreamResponse;

/// Upstream headers forwarded alongside the body.
pub const FORWARDED_HEADERS: [HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::CACHE_CONTROL,
    header::ETAG,
    header::LAST_MODIFIED,
    header::EXPIRES,
];

/// Turn a validated upstream response into the client response.
pub fn forward(upstream: UpstreamResponse) -> Response {
    let status = upstream.status();

    let mut headers = axum::http::HeaderMap::new();
    for name in FORWARDED_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            headers.insert(name, value.clone());
        }
    }

    let url = upstream.url().clone();
    let stream = upstream.into_body_stream().inspect_err(move |e| {
        tracing::warn!(url = %url, error = %e, "Upstream body failed mid-stream, aborting response");
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn upstream(headers: &[(&str, &str)], body: Vec<u8>) -> UpstreamResponse {
        let mut builder = axum::http::Response::builder().status(200);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        UpstreamResponse::new(reqwest::Response::from(builder.body(body).unwrap()))
    }

    #[tokio::test]
    async fn test_forwards_body_and_image_headers() {
        let body: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let response = forward(upstream(
            &[
                ("content-type", "image/png"),
                ("cache-control", "max-age=600"),
                ("set-cookie", "session=abc"),
                ("content-length", "4096"),
            ],
            body.clone(),
        ));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        assert_eq!(response.headers()["cache-control"], "max-age=600");
        assert!(response.headers().get("set-cookie").is_none());
        assert!(response.headers().get("content-length").is_none());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), body.as_slice());
    }
}
