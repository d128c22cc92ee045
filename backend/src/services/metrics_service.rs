//! Prometheus metrics for cache and upstream traffic.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder. Returns `None` if a recorder is
/// already installed.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

/// Count a dashboard cache lookup.
pub fn record_cache_lookup(kind: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("report_cache_lookups_total", "kind" => kind, "result" => result).increment(1);
}

/// Count a request to the incident-query service. `status` is 0 when the
/// request never got a response.
pub fn record_upstream_request(endpoint: &'static str, status: u16) {
    counter!(
        "report_upstream_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}
