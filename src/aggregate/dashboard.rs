// src/aggregate/dashboard.rs
//
// Dashboard fold: live inventory over container/blob listings, plus a
// bounded-window activity rollup over the event stream. The two sources
// degrade independently; a dead change feed never takes the inventory down.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feed::event::{file_extension, ChangeEvent, Operation};
use crate::storage::{BlobItem, BlobStore};

/// Containers whose name starts with this prefix are provider-internal and
/// excluded from inventory.
pub const SYSTEM_CONTAINER_PREFIX: char = '$';
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_containers: usize,
    pub total_files: usize,
    pub total_size: u64,
    pub total_file_types: usize,
    pub file_types: Vec<String>,
    pub total_users: u32,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStat {
    pub name: String,
    pub file_count: usize,
    pub total_size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetrics {
    pub uploads: u64,
    pub downloads: u64,
    pub deletions: u64,
    pub total_operations: u64,
}

/// Recent-activity row; slimmer than an audit-log entry.
#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub container: String,
    pub blob: String,
    pub operation: Operation,
    pub size: u64,
}

impl From<&ChangeEvent> for ActivityEntry {
    fn from(ev: &ChangeEvent) -> Self {
        Self {
            timestamp: ev.timestamp,
            container: ev.container.clone(),
            blob: ev.blob_path.clone(),
            operation: ev.operation.clone(),
            size: ev.size_bytes.unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: Overview,
    pub container_stats: Vec<ContainerStat>,
    pub activity_metrics: ActivityMetrics,
    pub recent_activity: Vec<ActivityEntry>,
    pub change_feed_enabled: bool,
}

/// Current state of one container from a live listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStats {
    pub total_files: usize,
    pub total_size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

pub fn current_stats(blobs: &[BlobItem]) -> CurrentStats {
    CurrentStats {
        total_files: blobs.len(),
        total_size: blobs.iter().map(|b| b.size).sum(),
        last_modified: blobs.iter().filter_map(|b| b.last_modified).max(),
    }
}

/// Coarse file-type categories for the overview chart; uncategorized
/// extensions pass through as-is.
pub fn categorize_extension(ext: &str) -> &str {
    match ext {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => "image",
        "pdf" => "pdf",
        "doc" | "docx" => "document",
        "xls" | "xlsx" => "spreadsheet",
        other => other,
    }
}

/// Enumerate user containers and their blobs into the overview and
/// per-container stats. Listing failures here are fatal for the request.
pub async fn live_inventory(
    store: &Arc<dyn BlobStore>,
    user_count: u32,
) -> anyhow::Result<(Overview, Vec<ContainerStat>)> {
    let containers: Vec<String> = store
        .list_containers()
        .await?
        .into_iter()
        .filter(|name| !name.starts_with(SYSTEM_CONTAINER_PREFIX))
        .collect();

    let mut total_files = 0usize;
    let mut total_size = 0u64;
    let mut file_types: BTreeSet<String> = BTreeSet::new();
    let mut stats = Vec::with_capacity(containers.len());

    for name in &containers {
        let blobs = store.list_blobs(name, None).await?;
        for blob in &blobs {
            total_files += 1;
            total_size += blob.size;
            if let Some(ext) = file_extension(&blob.name) {
                file_types.insert(categorize_extension(&ext).to_string());
            }
        }
        let current = current_stats(&blobs);
        stats.push(ContainerStat {
            name: name.clone(),
            file_count: current.total_files,
            total_size: current.total_size,
            last_modified: current.last_modified,
        });
    }

    stats.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    let overview = Overview {
        total_containers: containers.len(),
        total_files,
        total_size,
        total_file_types: file_types.len(),
        file_types: file_types.into_iter().collect(),
        total_users: user_count,
        last_updated: Utc::now(),
    };
    Ok((overview, stats))
}

/// Reduce a windowed event stream to operation totals and the most recent
/// entries, newest first. Passthrough kinds count toward the total only.
pub fn activity_rollup(events: &[ChangeEvent]) -> (ActivityMetrics, Vec<ActivityEntry>) {
    let mut metrics = ActivityMetrics::default();
    for ev in events {
        match ev.operation {
            Operation::Created => metrics.uploads += 1,
            Operation::Read => metrics.downloads += 1,
            Operation::Deleted => metrics.deletions += 1,
            Operation::Other(_) => {}
        }
        metrics.total_operations += 1;
    }

    let mut recent: Vec<&ChangeEvent> = events.iter().collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let recent = recent
        .into_iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .map(ActivityEntry::from)
        .collect();

    (metrics, recent)
}
