//! Server collaborator seam
//!
//! The orchestrator talks to the server through two traits: a cheap
//! [`MetadataProbe`] consulted on freshness decisions and an
//! [`ExportSource`] that downloads the full delimited-text export.
//! [`HttpExportSource`] implements both against the dashboard API.

use crate::config::IngestConfig;
use crate::constants::MAX_DOWNLOAD_PREALLOCATION_BYTES;
use crate::error::{IngestError, Result};
use crate::models::{DatasetKind, RawPayload, ServerMetadata};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Lightweight server metadata lookup
pub trait MetadataProbe: Send + Sync {
    fn probe(&self, kind: DatasetKind) -> impl Future<Output = Result<ServerMetadata>> + Send;
}

/// Bulk export download
///
/// `on_progress` receives the downloaded fraction (0.0-1.0) when the total
/// size is known; implementations may never call it.
pub trait ExportSource: MetadataProbe {
    fn fetch_export(
        &self,
        kind: DatasetKind,
        on_progress: &(dyn Fn(f64) + Send + Sync),
    ) -> impl Future<Output = Result<RawPayload>> + Send;
}

/// reqwest-backed client for the `/csv/...` endpoints
#[derive(Debug, Clone)]
pub struct HttpExportSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExportSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, kind: DatasetKind, path: &str) -> Result<reqwest::Response> {
        let url = self.url_for(path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::transport(kind, format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::transport(
                kind,
                format!("HTTP {} from {}", status, url),
            ));
        }
        Ok(response)
    }
}

impl MetadataProbe for HttpExportSource {
    async fn probe(&self, kind: DatasetKind) -> Result<ServerMetadata> {
        let response = self.get(kind, kind.metadata_path()).await?;
        response
            .json::<ServerMetadata>()
            .await
            .map_err(|e| IngestError::transport(kind, format!("invalid metadata response: {}", e)))
    }
}

impl ExportSource for HttpExportSource {
    async fn fetch_export(
        &self,
        kind: DatasetKind,
        on_progress: &(dyn Fn(f64) + Send + Sync),
    ) -> Result<RawPayload> {
        let mut response = self.get(kind, kind.export_path()).await?;
        let expected = response.content_length().filter(|len| *len > 0);

        let mut body = Vec::with_capacity(preallocation_hint(expected));
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| IngestError::transport(kind, format!("download interrupted: {}", e)))?
        {
            body.extend_from_slice(&chunk);
            if let Some(total) = expected {
                on_progress(body.len() as f64 / total as f64);
            }
        }
        debug!("Downloaded {} bytes for {}", body.len(), kind);

        let text = match String::from_utf8(body) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Ok(RawPayload::new(kind, text))
    }
}

/// Initial body capacity; the header is only a hint and is capped
fn preallocation_hint(content_length: Option<u64>) -> usize {
    let capped = content_length
        .unwrap_or(0)
        .min(MAX_DOWNLOAD_PREALLOCATION_BYTES);
    usize::try_from(capped).unwrap_or(0)
}
