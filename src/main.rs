//! blobwatch — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! See `README.md` for quickstart and tenant-directory configuration.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blobwatch::api::{self, AppState};
use blobwatch::cache::ResponseCache;
use blobwatch::directory::TomlDirectory;
use blobwatch::metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - BLOBWATCH_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("BLOBWATCH_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blobwatch=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables BLOBWATCH_TENANTS_PATH / BLOBWATCH_CACHE_TTL_SECS from
    // .env so the directory and cache can pick them up.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // Recorder first, so the gauges registered below have somewhere to land.
    let metrics_routes = metrics::install();

    let directory = TomlDirectory::load_default().expect("Failed to load tenant directory");
    let cache = ResponseCache::from_env();
    metrics::record_cache_settings(cache.ttl().as_secs());

    let state = AppState::new(Arc::new(directory), Arc::new(cache));
    let router = api::router(state).merge(metrics_routes);

    Ok(router.into())
}
