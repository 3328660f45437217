//! Metrics collection and exposition.
//!
//! # Metrics
//! - `image_proxy_requests_total` (counter): requests by status, outcome
//! - `image_proxy_request_duration_seconds` (histogram): time to response headers
//! - `image_proxy_auth_rejections_total` (counter): requests stopped by the authorizer
//!
//! Without an installed recorder every call is a no-op, so tests need no setup.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed request. `outcome` is `forwarded` or an error kind.
pub fn record_request(status: u16, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "image_proxy_requests_total",
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    metrics::histogram!(
        "image_proxy_request_duration_seconds",
        "outcome" => outcome
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_rejection() {
    metrics::counter!("image_proxy_auth_rejections_total").increment(1);
}
