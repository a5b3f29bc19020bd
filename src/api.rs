use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::aggregate::{dashboard, histogram::DailyUsage, log};
use crate::cache::{Category, ResponseCache};
use crate::directory::{AccountDirectory, TenantHandle};
use crate::feed;
use crate::feed::filter::{EventFilter, OperationFilter, TimeRange};

/// Header carrying the authenticated tenant id. Authentication itself runs
/// upstream of this service.
pub const TENANT_HEADER: &str = "x-company-id";

#[derive(Clone)]
pub struct AppState {
    directory: Arc<dyn AccountDirectory>,
    cache: Arc<ResponseCache>,
}

impl AppState {
    pub fn new(directory: Arc<dyn AccountDirectory>, cache: Arc<ResponseCache>) -> Self {
        Self { directory, cache }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/audit-logs", get(get_audit_logs))
        .route("/api/dashboard/stats", get(get_dashboard_stats))
        .route("/api/dashboard/storage/metrics", get(get_storage_metrics))
        .route("/api/dashboard/container/metrics", get(get_container_metrics))
        .route("/api/cache/clear-all", delete(clear_all_cache))
        .route("/api/cache/clear/{category}", delete(clear_cache_category))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---- Errors ----

/// Request failures either come back as a specific client status or collapse
/// into a generic 500; pipeline internals never leak partial results.
pub enum ApiError {
    BadRequest(&'static str),
    Unauthorized,
    NotFound(&'static str),
    Internal(anyhow::Error),
}

impl ApiError {
    fn internal(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ---- Shared handler plumbing ----

fn tenant_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthorized)
}

async fn resolve_tenant(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(String, TenantHandle), ApiError> {
    let tenant = tenant_id(headers)?;
    let handle = state
        .directory
        .resolve(&tenant)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ApiError::NotFound("Company not found"))?;
    Ok((tenant, handle))
}

#[derive(Clone, Copy)]
enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

fn cached_response(body: Value, status: CacheStatus) -> Response {
    let mut resp = Json(body).into_response();
    resp.headers_mut()
        .insert("x-cache", HeaderValue::from_static(status.as_str()));
    resp
}

fn query_fingerprint<Q: Serialize>(query: &Q) -> String {
    // Struct field order is fixed, so this is canonical per route.
    serde_json::to_string(query).expect("query serializes")
}

// ---- Audit log ----

fn default_page() -> usize {
    1
}
fn default_rows_per_page() -> usize {
    10
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogsQuery {
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub operation: OperationFilter,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_rows_per_page")]
    pub rows_per_page: usize,
}

async fn get_audit_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<AuditLogsQuery>,
) -> Result<Response, ApiError> {
    if q.page == 0 || q.rows_per_page == 0 {
        return Err(ApiError::BadRequest("page and rowsPerPage must be >= 1"));
    }
    let (tenant, handle) = resolve_tenant(&state, &headers).await?;

    let key = ResponseCache::key(&tenant, "/api/audit-logs", &query_fingerprint(&q));
    if let Some(body) = state.cache.get(&key) {
        return Ok(cached_response(body, CacheStatus::Hit));
    }

    let mut filter = EventFilter::default().operation(q.operation);
    if let Some(container) = &q.container_name {
        filter = filter.container(container.clone());
    }
    let snapshot = feed::collect_events(&handle.store, &filter)
        .await
        .map_err(ApiError::internal)?;
    let page = log::paginate(snapshot.events, q.page, q.rows_per_page);

    let body = serde_json::to_value(&page).expect("page serializes");
    state.cache.put(key, Category::AuditLogs, body.clone());
    Ok(cached_response(body, CacheStatus::Miss))
}

// ---- Dashboard ----

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    #[serde(default)]
    pub time_range: TimeRange,
}

async fn get_dashboard_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<DashboardQuery>,
) -> Result<Response, ApiError> {
    let (tenant, handle) = resolve_tenant(&state, &headers).await?;

    let key = ResponseCache::key(&tenant, "/api/dashboard/stats", &query_fingerprint(&q));
    if let Some(body) = state.cache.get(&key) {
        return Ok(cached_response(body, CacheStatus::Hit));
    }

    // Live inventory is authoritative; a dead change feed only zeroes the
    // activity half of the response.
    let (overview, container_stats) = dashboard::live_inventory(&handle.store, handle.user_count)
        .await
        .map_err(ApiError::internal)?;

    let filter = EventFilter::default().window(q.time_range.window_ending_now());
    let snapshot = feed::collect_events(&handle.store, &filter)
        .await
        .map_err(ApiError::internal)?;
    let (activity_metrics, recent_activity) = dashboard::activity_rollup(&snapshot.events);

    let stats = dashboard::DashboardStats {
        overview,
        container_stats,
        activity_metrics,
        recent_activity,
        change_feed_enabled: snapshot.enabled,
    };

    let body = serde_json::to_value(&stats).expect("stats serialize");
    state.cache.put(key, Category::Dashboard, body.clone());
    Ok(cached_response(body, CacheStatus::Miss))
}

async fn get_storage_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<DashboardQuery>,
) -> Result<Response, ApiError> {
    let (tenant, handle) = resolve_tenant(&state, &headers).await?;

    let key = ResponseCache::key(
        &tenant,
        "/api/dashboard/storage/metrics",
        &query_fingerprint(&q),
    );
    if let Some(body) = state.cache.get(&key) {
        return Ok(cached_response(body, CacheStatus::Hit));
    }

    let filter = EventFilter::default().window(q.time_range.window_ending_now());
    let snapshot = feed::collect_events(&handle.store, &filter)
        .await
        .map_err(ApiError::internal)?;
    let usage = DailyUsage::collect(&snapshot.events);

    let body = json!({
        "uploads": usage.uploads.into_counts(),
        "downloads": usage.downloads.into_counts(),
        "deletions": usage.deletions.into_counts(),
        "size": usage.size.into_sizes(),
    });
    state.cache.put(key, Category::Dashboard, body.clone());
    Ok(cached_response(body, CacheStatus::Miss))
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerMetricsQuery {
    pub container_name: String,
    #[serde(default)]
    pub time_range: TimeRange,
}

async fn get_container_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ContainerMetricsQuery>,
) -> Result<Response, ApiError> {
    let (tenant, handle) = resolve_tenant(&state, &headers).await?;

    let key = ResponseCache::key(
        &tenant,
        "/api/dashboard/container/metrics",
        &query_fingerprint(&q),
    );
    if let Some(body) = state.cache.get(&key) {
        return Ok(cached_response(body, CacheStatus::Hit));
    }

    let exists = handle
        .store
        .container_exists(&q.container_name)
        .await
        .map_err(ApiError::internal)?;
    if !exists {
        return Err(ApiError::NotFound("Container not found"));
    }

    let filter = EventFilter::default()
        .container(q.container_name.clone())
        .window(q.time_range.window_ending_now());
    let snapshot = feed::collect_events(&handle.store, &filter)
        .await
        .map_err(ApiError::internal)?;
    let usage = DailyUsage::collect(&snapshot.events);

    let blobs = handle
        .store
        .list_blobs(&q.container_name, None)
        .await
        .map_err(ApiError::internal)?;
    let current_stats = dashboard::current_stats(&blobs);

    let body = json!({
        "currentStats": current_stats,
        "uploads": usage.uploads.into_counts(),
        "downloads": usage.downloads.into_counts(),
        "deletions": usage.deletions.into_counts(),
        "size": usage.size.into_sizes(),
        "fileTypes": usage.file_types.into_counts(),
    });
    state.cache.put(key, Category::Dashboard, body.clone());
    Ok(cached_response(body, CacheStatus::Miss))
}

// ---- Cache administration ----

async fn clear_all_cache(State(state): State<AppState>) -> Json<Value> {
    state.cache.clear();
    tracing::info!("manual cache clear requested");
    Json(json!({
        "status": "success",
        "message": "All cache cleared successfully"
    }))
}

async fn clear_cache_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let parsed = Category::parse(&category).ok_or(ApiError::BadRequest(
        "Invalid cache type. Use: dashboard or audit-logs",
    ))?;
    state.cache.invalidate(parsed);
    tracing::info!(category = %category, "manual cache clear requested");
    Ok(Json(json!({
        "status": "success",
        "message": format!("{category} cache cleared successfully")
    })))
}
