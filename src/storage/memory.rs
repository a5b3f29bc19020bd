// src/storage/memory.rs
//
// In-memory BlobStore used by tests and local fixture runs. Containers and
// blobs are built up-front; the trait impl is read-only.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::storage::client::BlobStore;
use crate::storage::types::BlobItem;

#[derive(Debug, Default)]
pub struct MemoryStore {
    containers: BTreeMap<String, Vec<StoredBlob>>,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    name: String,
    last_modified: Option<DateTime<Utc>>,
    content: Vec<u8>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_container(&mut self, name: impl Into<String>) -> &mut Self {
        self.containers.entry(name.into()).or_default();
        self
    }

    /// Insert a blob, creating the container when needed.
    pub fn put_blob(
        &mut self,
        container: impl Into<String>,
        name: impl Into<String>,
        content: Vec<u8>,
        last_modified: Option<DateTime<Utc>>,
    ) -> &mut Self {
        self.containers
            .entry(container.into())
            .or_default()
            .push(StoredBlob {
                name: name.into(),
                last_modified,
                content,
            });
        self
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    async fn container_exists(&self, container: &str) -> Result<bool> {
        Ok(self.containers.contains_key(container))
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        Ok(self.containers.keys().cloned().collect())
    }

    async fn list_blobs(&self, container: &str, prefix: Option<&str>) -> Result<Vec<BlobItem>> {
        let blobs = self
            .containers
            .get(container)
            .ok_or_else(|| anyhow!("container {container} not found"))?;
        let mut items: Vec<BlobItem> = blobs
            .iter()
            .filter(|b| prefix.map_or(true, |p| b.name.starts_with(p)))
            .map(|b| BlobItem::new(b.name.clone(), b.content.len() as u64, b.last_modified))
            .collect();
        // The real service lists lexicographically.
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn fetch(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        self.containers
            .get(container)
            .and_then(|blobs| blobs.iter().find(|b| b.name == blob))
            .map(|b| b.content.clone())
            .ok_or_else(|| anyhow!("blob {container}/{blob} not found"))
    }
}
