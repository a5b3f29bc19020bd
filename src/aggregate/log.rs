// src/aggregate/log.rs
//
// Audit-log fold: newest-first sort plus pagination.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feed::event::{ChangeEvent, Operation};

/// One audit-log row as served to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub container: String,
    pub blob: String,
    pub operation: Operation,
    pub details: BTreeMap<String, String>,
}

impl From<ChangeEvent> for LogEntry {
    fn from(ev: ChangeEvent) -> Self {
        Self {
            timestamp: ev.timestamp,
            container: ev.container,
            blob: ev.blob_path,
            operation: ev.operation,
            details: ev.details,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogPage {
    pub logs: Vec<LogEntry>,
    pub total: usize,
    pub page: usize,
    pub rows_per_page: usize,
    pub total_pages: usize,
}

/// Sort descending by timestamp (stable, so ties keep discovery order) and
/// slice out the requested 1-based page. A page past the end yields an empty
/// slice, not an error. `rows_per_page` is validated upstream to be >= 1.
pub fn paginate(mut events: Vec<ChangeEvent>, page: usize, rows_per_page: usize) -> AuditLogPage {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let total = events.len();
    let total_pages = total.div_ceil(rows_per_page.max(1));
    let start = page.saturating_sub(1).saturating_mul(rows_per_page);
    let logs = events
        .into_iter()
        .skip(start)
        .take(rows_per_page)
        .map(LogEntry::from)
        .collect();

    AuditLogPage {
        logs,
        total,
        page,
        rows_per_page,
        total_pages,
    }
}
