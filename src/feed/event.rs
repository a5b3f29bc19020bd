// src/feed/event.rs
//
// Raw change-feed records and their canonical form. Everything downstream of
// decode works on `ChangeEvent` only; the raw provider shape never leaks past
// `normalize`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// One record as stored in a change-feed segment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub event_time: DateTime<Utc>,
    pub event_type: String,
    /// Slash-delimited subject, e.g. `/invoices/2024/q1/report.pdf`.
    pub subject: String,
    #[serde(default)]
    pub data: RawEventData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventData {
    pub api: Option<String>,
    pub client_request_id: Option<String>,
    pub request_id: Option<String>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub blob_type: Option<String>,
    pub url: Option<String>,
    pub sequencer: Option<String>,
}

/// Canonical operation kind. Unrecognized raw types pass through so the
/// consumers can still count and display them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Created,
    Read,
    Deleted,
    Other(String),
}

impl Operation {
    /// Case-insensitive substring match against the raw event type
    /// (e.g. `Microsoft.Storage.BlobCreated` and `blobcreated` both map
    /// to `Created`).
    pub fn from_event_type(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.contains("blobcreated") {
            Operation::Created
        } else if lower.contains("blobread") {
            Operation::Read
        } else if lower.contains("blobdeleted") {
            Operation::Deleted
        } else {
            Operation::Other(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operation::Created => "create",
            Operation::Read => "read",
            Operation::Deleted => "delete",
            Operation::Other(raw) => raw,
        }
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Canonical, provider-agnostic change event. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub timestamp: DateTime<Utc>,
    /// First path segment of the subject; always non-empty.
    pub container: String,
    /// Remaining path segments joined by `/`.
    pub blob_path: String,
    pub operation: Operation,
    /// Content length at event time; absent on reads/deletes in some providers.
    pub size_bytes: Option<u64>,
    /// Opaque passthrough metadata for display.
    pub details: BTreeMap<String, String>,
}

/// Map a raw record to its canonical form. Returns `None` when the subject
/// has no container component; such events are dropped rather than
/// propagated.
pub fn normalize(raw: RawEvent) -> Option<ChangeEvent> {
    let parts: Vec<&str> = raw.subject.split('/').collect();
    let container = match parts.get(1) {
        Some(c) if !c.is_empty() => (*c).to_string(),
        _ => return None,
    };
    let blob_path = parts.get(2..).map(|rest| rest.join("/")).unwrap_or_default();

    let mut details = BTreeMap::new();
    let d = &raw.data;
    for (key, value) in [
        ("api", &d.api),
        ("clientRequestId", &d.client_request_id),
        ("requestId", &d.request_id),
        ("etag", &d.etag),
        ("contentType", &d.content_type),
        ("blobType", &d.blob_type),
        ("url", &d.url),
        ("sequencer", &d.sequencer),
    ] {
        if let Some(v) = value {
            details.insert(key.to_string(), v.clone());
        }
    }

    Some(ChangeEvent {
        timestamp: raw.event_time,
        container,
        blob_path,
        operation: Operation::from_event_type(&raw.event_type),
        size_bytes: raw.data.content_length,
        details,
    })
}

/// Lowercased extension of a blob path, `None` for extensionless names.
pub fn file_extension(path: &str) -> Option<String> {
    let (stem, ext) = path.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
