// src/metrics.rs
//
// Prometheus surface. One global recorder installed at boot; everything the
// pipeline and cache emit through `counter!`/`gauge!` lands in its registry.

use axum::{routing::get, Router};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global recorder and return the `/metrics` routes.
/// Panics if a recorder is already installed; call exactly once at boot.
pub fn install() -> Router {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("prometheus: install recorder");
    Router::new().route("/metrics", get(move || render(handle.clone())))
}

async fn render(handle: PrometheusHandle) -> String {
    handle.render()
}

/// Export static cache configuration so dashboards can show the configured
/// TTL next to the hit/miss counters.
pub fn record_cache_settings(ttl_secs: u64) {
    describe_gauge!(
        "response_cache_ttl_secs",
        "Absolute response-cache TTL in seconds."
    );
    gauge!("response_cache_ttl_secs").set(ttl_secs as f64);
}
