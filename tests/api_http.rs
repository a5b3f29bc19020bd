// tests/api_http.rs
//
// Router-level tests: requests go through the real Axum router via
// `tower::ServiceExt::oneshot`, backed by the in-memory store.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use blobwatch::api::{self, AppState, TENANT_HEADER};
use blobwatch::cache::ResponseCache;
use blobwatch::directory::StaticDirectory;
use blobwatch::storage::{BlobStore, MemoryStore};

const FEED: &str = "$blobchangefeed";
const TENANT: &str = "acme";

fn raw_event(ts: &str, event_type: &str, subject: &str, size: Option<u64>) -> Value {
    let mut data = json!({ "api": "PutBlob" });
    if let Some(size) = size {
        data["contentLength"] = json!(size);
    }
    json!({
        "eventTime": ts,
        "eventType": event_type,
        "subject": subject,
        "data": data,
    })
}

fn app_with_store(mem: MemoryStore) -> Router {
    let store: Arc<dyn BlobStore> = Arc::new(mem);
    let directory = StaticDirectory::new().with_tenant(TENANT, store, 7);
    let cache = ResponseCache::new(StdDuration::from_secs(300));
    api::router(AppState::new(Arc::new(directory), Arc::new(cache)))
}

async fn get(app: &Router, uri: &str, tenant: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().uri(uri);
    if let Some(tenant) = tenant {
        req = req.header(TENANT_HEADER, tenant);
    }
    let resp = app
        .clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

#[tokio::test]
async fn health_answers_without_a_tenant() {
    let app = app_with_store(MemoryStore::new());
    let (status, body) = get(&app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn missing_tenant_header_is_unauthorized() {
    let app = app_with_store(MemoryStore::new());
    let (status, body) = get(&app, "/api/audit-logs", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn unknown_tenant_is_not_found() {
    let app = app_with_store(MemoryStore::new());
    let (status, body) = get(&app, "/api/audit-logs", Some("ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Company not found" }));
}

#[tokio::test]
async fn audit_logs_empty_feed_yields_an_empty_first_page() {
    // No change-feed container at all; the page shape is still complete.
    let app = app_with_store(MemoryStore::new());
    let (status, body) = get(&app, "/api/audit-logs", Some(TENANT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "logs": [],
            "total": 0,
            "page": 1,
            "rowsPerPage": 10,
            "totalPages": 0
        })
    );
}

fn store_with_numbered_events(count: usize) -> MemoryStore {
    let events: Vec<Value> = (0..count)
        .map(|i| {
            let ts = format!("2024-03-01T00:{i:02}:00Z");
            raw_event(&ts, "BlobCreated", &format!("/docs/file-{i:02}.txt"), Some(10))
        })
        .collect();
    let mut mem = MemoryStore::new();
    mem.put_blob(
        FEED,
        "log/00/seg.avro",
        serde_json::to_vec(&events).unwrap(),
        None,
    );
    mem
}

#[tokio::test]
async fn audit_logs_paginate_newest_first() {
    let app = app_with_store(store_with_numbered_events(25));

    let (status, body) = get(&app, "/api/audit-logs?page=3&rowsPerPage=10", Some(TENANT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(25));
    assert_eq!(body["totalPages"], json!(3));
    assert_eq!(body["page"], json!(3));
    // 25 rows at 10 per page leave 5 on the last page, oldest of the set.
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 5);
    assert_eq!(logs[4]["blob"], json!("file-00.txt"));

    let (_, first) = get(&app, "/api/audit-logs", Some(TENANT)).await;
    assert_eq!(first["logs"][0]["blob"], json!("file-24.txt"));
    assert_eq!(first["logs"][0]["operation"], json!("create"));
}

#[tokio::test]
async fn audit_logs_past_the_end_are_empty_but_well_formed() {
    let app = app_with_store(store_with_numbered_events(3));
    let (status, body) = get(&app, "/api/audit-logs?page=9", Some(TENANT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"], json!([]));
    assert_eq!(body["total"], json!(3));
    assert_eq!(body["totalPages"], json!(1));
}

#[tokio::test]
async fn audit_logs_honor_operation_and_container_filters() {
    let mut mem = MemoryStore::new();
    let events = vec![
        raw_event("2024-03-01T10:00:00Z", "BlobCreated", "/docs/a.txt", Some(1)),
        raw_event("2024-03-01T11:00:00Z", "BlobDeleted", "/docs/a.txt", Some(1)),
        raw_event("2024-03-01T12:00:00Z", "BlobCreated", "/media/b.png", Some(1)),
    ];
    mem.put_blob(FEED, "log/00/seg.avro", serde_json::to_vec(&events).unwrap(), None);
    let app = app_with_store(mem);

    let (_, body) = get(&app, "/api/audit-logs?operation=delete", Some(TENANT)).await;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["logs"][0]["operation"], json!("delete"));

    let (_, body) = get(&app, "/api/audit-logs?containerName=media", Some(TENANT)).await;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["logs"][0]["container"], json!("media"));
}

#[tokio::test]
async fn audit_logs_reject_invalid_paging_and_filters() {
    let app = app_with_store(MemoryStore::new());

    let (status, _) = get(&app, "/api/audit-logs?page=0", Some(TENANT)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/api/audit-logs?rowsPerPage=0", Some(TENANT)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/api/audit-logs?operation=upload", Some(TENANT)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_degrades_without_a_change_feed() {
    let now = Utc::now();
    let mut mem = MemoryStore::new();
    mem.put_blob("docs", "report.pdf", vec![0u8; 100], Some(now))
        .put_blob("docs", "notes.txt", vec![0u8; 20], Some(now - Duration::hours(1)));
    let app = app_with_store(mem);

    let (status, body) = get(&app, "/api/dashboard/stats", Some(TENANT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changeFeedEnabled"], json!(false));
    assert_eq!(body["overview"]["totalContainers"], json!(1));
    assert_eq!(body["overview"]["totalFiles"], json!(2));
    assert_eq!(body["overview"]["totalSize"], json!(120));
    assert_eq!(body["overview"]["totalUsers"], json!(7));
    assert_eq!(body["activityMetrics"]["totalOperations"], json!(0));
    assert_eq!(body["recentActivity"], json!([]));
    assert_eq!(body["containerStats"][0]["name"], json!("docs"));
    assert_eq!(body["containerStats"][0]["fileCount"], json!(2));
}

#[tokio::test]
async fn dashboard_excludes_system_containers_and_rolls_up_activity() {
    let now = Utc::now();
    let events = vec![
        raw_event(
            &(now - Duration::hours(1)).to_rfc3339(),
            "BlobCreated",
            "/docs/new.pdf",
            Some(50),
        ),
        raw_event(
            &(now - Duration::hours(2)).to_rfc3339(),
            "BlobDeleted",
            "/docs/old.pdf",
            Some(30),
        ),
    ];
    let mut mem = MemoryStore::new();
    mem.put_blob("docs", "new.pdf", vec![0u8; 50], Some(now))
        .put_blob(FEED, "log/00/seg.avro", serde_json::to_vec(&events).unwrap(), None);
    let app = app_with_store(mem);

    let (status, body) = get(&app, "/api/dashboard/stats", Some(TENANT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changeFeedEnabled"], json!(true));
    // $blobchangefeed is provider-internal, never part of the inventory.
    assert_eq!(body["overview"]["totalContainers"], json!(1));
    assert_eq!(body["overview"]["fileTypes"], json!(["pdf"]));
    assert_eq!(body["activityMetrics"]["uploads"], json!(1));
    assert_eq!(body["activityMetrics"]["deletions"], json!(1));
    assert_eq!(body["activityMetrics"]["totalOperations"], json!(2));
    let recent = body["recentActivity"].as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["blob"], json!("new.pdf"));
}

#[tokio::test]
async fn storage_metrics_bucket_by_day() {
    let now = Utc::now();
    let events = vec![
        raw_event(&(now - Duration::hours(1)).to_rfc3339(), "BlobCreated", "/docs/a.txt", Some(100)),
        raw_event(&(now - Duration::hours(2)).to_rfc3339(), "BlobRead", "/docs/a.txt", None),
        raw_event(&(now - Duration::hours(3)).to_rfc3339(), "BlobDeleted", "/docs/b.txt", Some(40)),
    ];
    let mut mem = MemoryStore::new();
    mem.put_blob(FEED, "log/00/seg.avro", serde_json::to_vec(&events).unwrap(), None);
    let app = app_with_store(mem);

    let (status, body) = get(
        &app,
        "/api/dashboard/storage/metrics?timeRange=week",
        Some(TENANT),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let total = |series: &Value, field: &str| -> i64 {
        series
            .as_array()
            .unwrap()
            .iter()
            .map(|point| point[field].as_i64().unwrap())
            .sum()
    };
    assert_eq!(total(&body["uploads"], "count"), 1);
    assert_eq!(total(&body["downloads"], "count"), 1);
    assert_eq!(total(&body["deletions"], "count"), 1);
    assert_eq!(total(&body["size"], "size"), 60);
}

#[tokio::test]
async fn storage_metrics_reject_unknown_time_range() {
    let app = app_with_store(MemoryStore::new());
    let (status, _) = get(
        &app,
        "/api/dashboard/storage/metrics?timeRange=fortnight",
        Some(TENANT),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn container_metrics_require_an_existing_container() {
    let app = app_with_store(MemoryStore::new());
    let (status, body) = get(
        &app,
        "/api/dashboard/container/metrics?containerName=ghost",
        Some(TENANT),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Container not found" }));
}

#[tokio::test]
async fn container_metrics_combine_current_state_and_history() {
    let now = Utc::now();
    let events = vec![
        raw_event(&(now - Duration::hours(1)).to_rfc3339(), "BlobCreated", "/docs/a.pdf", Some(100)),
        raw_event(&(now - Duration::hours(2)).to_rfc3339(), "BlobCreated", "/media/c.png", Some(999)),
    ];
    let mut mem = MemoryStore::new();
    mem.put_blob("docs", "a.pdf", vec![0u8; 100], Some(now))
        .put_blob("docs", "b.txt", vec![0u8; 25], Some(now - Duration::hours(5)))
        .put_blob(FEED, "log/00/seg.avro", serde_json::to_vec(&events).unwrap(), None);
    let app = app_with_store(mem);

    let (status, body) = get(
        &app,
        "/api/dashboard/container/metrics?containerName=docs",
        Some(TENANT),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentStats"]["totalFiles"], json!(2));
    assert_eq!(body["currentStats"]["totalSize"], json!(125));
    // History scoped to the requested container; the media upload is invisible.
    assert_eq!(body["uploads"].as_array().unwrap().len(), 1);
    assert_eq!(body["uploads"][0]["count"], json!(1));
    assert_eq!(body["fileTypes"], json!([{ "type": "pdf", "count": 1 }]));
}
