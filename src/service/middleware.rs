//! Service middleware for request metrics.
//!
//! Metrics are emitted as structured log lines under the
//! `gerber_render::metrics` target and aggregated from logs:
//!
//! - `request` - path, method, status and latency of every request
//! - `conversion` - outcome, image count and latency of every conversion

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use regex_lite::Regex;
use tracing::info;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    // Log metrics for Cloud Monitoring (can be aggregated from logs)
    info!(
        target: "gerber_render::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Artifact names embed the conversion id, so every UUID becomes `:id`.
fn normalize_path(path: &str) -> String {
    static UUID: OnceLock<Option<Regex>> = OnceLock::new();
    let uuid = UUID.get_or_init(|| {
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
    });

    // Replace UUIDs with :id placeholder
    match uuid {
        Some(re) => re.replace_all(path, ":id").into_owned(),
        None => path.to_string(),
    }
}

/// Record the outcome of one conversion.
///
/// `outcome` is `"success"` or the failure's error code.
pub fn record_conversion_metrics(outcome: &str, image_count: usize, latency_ms: u64) {
    info!(
        target: "gerber_render::metrics",
        metric_type = "conversion",
        outcome = outcome,
        image_count = image_count,
        latency_ms = latency_ms,
        "conversion_metric"
    );
}
