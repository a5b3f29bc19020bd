// src/directory.rs
//
// Tenant -> storage-account directory. Authentication happens upstream; by
// the time a request reaches a handler it carries a tenant id, and this
// module resolves that id to the tenant's blob namespace.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::storage::{AzureBlobStore, BlobStore};

pub const ENV_TENANTS_PATH: &str = "BLOBWATCH_TENANTS_PATH";
pub const DEFAULT_TENANTS_PATH: &str = "config/tenants.toml";

/// Resolved handle for one tenant.
#[derive(Clone)]
pub struct TenantHandle {
    pub store: Arc<dyn BlobStore>,
    /// Seat count for the dashboard overview.
    pub user_count: u32,
}

#[async_trait::async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `Ok(None)` means the tenant is unknown (a 404, not a server error).
    async fn resolve(&self, tenant_id: &str) -> Result<Option<TenantHandle>>;
}

#[derive(Debug, Deserialize)]
struct TenantsFile {
    #[serde(default)]
    tenants: Vec<TenantAccount>,
}

#[derive(Debug, Deserialize)]
struct TenantAccount {
    id: String,
    storage_account: String,
    sas_token: String,
    /// Override for emulators (Azurite) and sovereign clouds.
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    user_count: u32,
}

/// Directory backed by a TOML file; handles are built once at load time.
pub struct TomlDirectory {
    handles: HashMap<String, TenantHandle>,
}

impl TomlDirectory {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading tenant directory from {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load using env var + fallback:
    /// 1) $BLOBWATCH_TENANTS_PATH
    /// 2) config/tenants.toml
    /// Missing fallback file yields an empty directory, not an error.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_TENANTS_PATH) {
            return Self::load_from(Path::new(&p));
        }
        let fallback = Path::new(DEFAULT_TENANTS_PATH);
        if fallback.exists() {
            return Self::load_from(fallback);
        }
        Ok(Self {
            handles: HashMap::new(),
        })
    }

    fn parse(content: &str) -> Result<Self> {
        let file: TenantsFile = toml::from_str(content).context("parsing tenant directory toml")?;
        let mut handles = HashMap::with_capacity(file.tenants.len());
        for tenant in file.tenants {
            let store: Arc<dyn BlobStore> = match &tenant.endpoint {
                Some(endpoint) => {
                    Arc::new(AzureBlobStore::with_endpoint(endpoint.clone(), &tenant.sas_token))
                }
                None => Arc::new(AzureBlobStore::new(
                    &tenant.storage_account,
                    &tenant.sas_token,
                )),
            };
            handles.insert(
                tenant.id,
                TenantHandle {
                    store,
                    user_count: tenant.user_count,
                },
            );
        }
        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[async_trait::async_trait]
impl AccountDirectory for TomlDirectory {
    async fn resolve(&self, tenant_id: &str) -> Result<Option<TenantHandle>> {
        Ok(self.handles.get(tenant_id).cloned())
    }
}

/// Fixed in-memory directory for tests and local fixture runs.
#[derive(Default)]
pub struct StaticDirectory {
    handles: HashMap<String, TenantHandle>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(
        mut self,
        tenant_id: impl Into<String>,
        store: Arc<dyn BlobStore>,
        user_count: u32,
    ) -> Self {
        self.handles
            .insert(tenant_id.into(), TenantHandle { store, user_count });
        self
    }
}

#[async_trait::async_trait]
impl AccountDirectory for StaticDirectory {
    async fn resolve(&self, tenant_id: &str) -> Result<Option<TenantHandle>> {
        Ok(self.handles.get(tenant_id).cloned())
    }
}
