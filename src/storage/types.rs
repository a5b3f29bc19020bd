// src/storage/types.rs
use chrono::{DateTime, Utc};

/// One listed blob: name plus the properties the aggregators care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    /// Content length in bytes; zero when the provider omits it.
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl BlobItem {
    pub fn new(name: impl Into<String>, size: u64, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            size,
            last_modified,
        }
    }
}
