// src/storage/azure.rs
//
// Azure Blob Storage REST client, SAS-token authenticated. Listing responses
// are the service's XML enumeration format; we parse only the fields the
// aggregators consume.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::storage::client::BlobStore;
use crate::storage::types::BlobItem;

pub struct AzureBlobStore {
    endpoint: String,
    sas_token: String,
    client: reqwest::Client,
}

impl AzureBlobStore {
    pub fn new(account: &str, sas_token: &str) -> Self {
        Self::with_endpoint(
            format!("https://{account}.blob.core.windows.net"),
            sas_token,
        )
    }

    /// Custom endpoint, e.g. an Azurite emulator (`http://127.0.0.1:10000/acct`).
    pub fn with_endpoint(endpoint: impl Into<String>, sas_token: &str) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            sas_token: sas_token.trim_start_matches('?').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str, query: &str) -> String {
        let mut url = format!("{}/{}", self.endpoint, path.trim_start_matches('/'));
        let mut sep = '?';
        if !query.is_empty() {
            url.push(sep);
            url.push_str(query);
            sep = '&';
        }
        if !self.sas_token.is_empty() {
            url.push(sep);
            url.push_str(&self.sas_token);
        }
        url
    }
}

#[async_trait::async_trait]
impl BlobStore for AzureBlobStore {
    async fn container_exists(&self, container: &str) -> Result<bool> {
        let url = self.url(container, "restype=container");
        let resp = self
            .client
            .head(&url)
            .send()
            .await
            .with_context(|| format!("checking container {container}"))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        resp.error_for_status()
            .with_context(|| format!("checking container {container}"))?;
        Ok(true)
    }

    async fn list_containers(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let query = match &marker {
                Some(m) => format!("comp=list&marker={m}"),
                None => "comp=list".to_string(),
            };
            let url = self.url("", &query);
            let body = self
                .client
                .get(&url)
                .send()
                .await
                .context("listing containers")?
                .error_for_status()
                .context("listing containers")?
                .text()
                .await
                .context("reading container list body")?;
            let parsed: ContainerEnumeration =
                quick_xml::de::from_str(&body).context("parsing container list xml")?;
            names.extend(parsed.containers.items.into_iter().map(|c| c.name));
            marker = continuation(parsed.next_marker);
            if marker.is_none() {
                break;
            }
        }
        Ok(names)
    }

    async fn list_blobs(&self, container: &str, prefix: Option<&str>) -> Result<Vec<BlobItem>> {
        let mut items = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let url = self.url(container, &blob_list_query(prefix, marker.as_deref()));
            let body = self
                .client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("listing blobs in {container}"))?
                .error_for_status()
                .with_context(|| format!("listing blobs in {container}"))?
                .text()
                .await
                .context("reading blob list body")?;
            let parsed: BlobEnumeration =
                quick_xml::de::from_str(&body).context("parsing blob list xml")?;
            items.extend(parsed.blobs.items.into_iter().map(|b| BlobItem {
                name: b.name,
                size: b.properties.content_length.unwrap_or(0),
                last_modified: b
                    .properties
                    .last_modified
                    .as_deref()
                    .and_then(parse_http_date),
            }));
            marker = continuation(parsed.next_marker);
            if marker.is_none() {
                break;
            }
        }
        Ok(items)
    }

    async fn fetch(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("{container}/{blob}"), "");
        let bytes = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("downloading {container}/{blob}"))?
            .error_for_status()
            .with_context(|| format!("downloading {container}/{blob}"))?
            .bytes()
            .await
            .with_context(|| format!("reading {container}/{blob}"))?;
        Ok(bytes.to_vec())
    }
}

/// Listings are paged at 5000 entries; the service signals more pages with a
/// non-empty `NextMarker`. An absent or empty marker ends the walk.
fn continuation(marker: Option<String>) -> Option<String> {
    marker.filter(|m| !m.is_empty())
}

fn blob_list_query(prefix: Option<&str>, marker: Option<&str>) -> String {
    let mut query = String::from("restype=container&comp=list");
    if let Some(p) = prefix {
        query.push_str("&prefix=");
        query.push_str(p);
    }
    if let Some(m) = marker {
        query.push_str("&marker=");
        query.push_str(m);
    }
    query
}

/// `Last-Modified` comes back as an RFC 1123 HTTP date, which RFC 2822
/// parsing accepts.
fn parse_http_date(ts: &str) -> Option<DateTime<Utc>> {
    let parsed = OffsetDateTime::parse(ts, &Rfc2822).ok()?;
    let unix = parsed.to_offset(UtcOffset::UTC).unix_timestamp();
    DateTime::<Utc>::from_timestamp(unix, 0)
}

// ---- XML shapes (subset of EnumerationResults) ----

#[derive(Debug, Deserialize)]
struct ContainerEnumeration {
    #[serde(rename = "Containers", default)]
    containers: ContainerItems,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerItems {
    #[serde(rename = "Container", default)]
    items: Vec<ContainerEntry>,
}

#[derive(Debug, Deserialize)]
struct ContainerEntry {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct BlobEnumeration {
    #[serde(rename = "Blobs", default)]
    blobs: BlobItems,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobItems {
    #[serde(rename = "Blob", default)]
    items: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
struct BlobEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Properties", default)]
    properties: BlobProperties,
}

#[derive(Debug, Default, Deserialize)]
struct BlobProperties {
    #[serde(rename = "Content-Length", default)]
    content_length: Option<u64>,
    #[serde(rename = "Last-Modified", default)]
    last_modified: Option<String>,
}
