// src/storage/client.rs
use anyhow::Result;

use crate::storage::types::BlobItem;

/// Boundary to one tenant's blob namespace.
///
/// The pipeline only ever needs these four operations: existence checks and
/// listings for inventory, prefixed listings for segment discovery, and full
/// downloads for segment decode.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn container_exists(&self, container: &str) -> Result<bool>;

    /// All container names in the account, in provider order.
    async fn list_containers(&self) -> Result<Vec<String>>;

    /// Blobs in one container, optionally narrowed to a name prefix.
    async fn list_blobs(&self, container: &str, prefix: Option<&str>) -> Result<Vec<BlobItem>>;

    /// Full content of one blob.
    async fn fetch(&self, container: &str, blob: &str) -> Result<Vec<u8>>;
}
