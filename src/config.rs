//! Configuration management and validation.
//!
//! Provides the ingestion configuration with defaults, builder methods,
//! layered loading (file -> environment) and validation rules.

use crate::constants::{
    CACHE_DIR_NAME, DEFAULT_API_BASE_URL, DEFAULT_DOWNLOAD_PROGRESS_END, DEFAULT_MAX_AGE_MINUTES,
    DEFAULT_PARSE_BATCH_SIZE, DEFAULT_PARSE_PROGRESS_END, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_WRITE_ROW_GROUP_SIZE, ENV_API_BASE_URL, ENV_CACHE_DIR, PROGRESS_COMPLETE,
};
use crate::error::{IngestError, Result};
use crate::models::ServerMetadata;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How the opaque server version marker is derived from a metadata probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionMarkerStrategy {
    /// Total row count reported by the server
    #[default]
    RowCount,
    /// Last-modified timestamp of the export
    LastModified,
    /// Row count and last-modified together
    Combined,
}

impl VersionMarkerStrategy {
    /// Derive the marker, or `None` when the probe lacks the needed fields
    pub fn marker_for(&self, metadata: &ServerMetadata) -> Option<String> {
        match self {
            VersionMarkerStrategy::RowCount => metadata.total_rows.map(|rows| rows.to_string()),
            VersionMarkerStrategy::LastModified => {
                metadata.last_modified.map(|mtime| format!("{:.3}", mtime))
            }
            VersionMarkerStrategy::Combined => match (metadata.total_rows, metadata.last_modified)
            {
                (Some(rows), Some(mtime)) => Some(format!("{}@{:.3}", rows, mtime)),
                _ => None,
            },
        }
    }
}

/// Split of overall progress between download, parse and persistence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSplit {
    /// Download occupies `0..download_end`
    pub download_end: f64,
    /// Parse occupies `download_end..parse_end`, persistence `parse_end..100`
    pub parse_end: f64,
}

impl ProgressSplit {
    /// Map a parse percentage (0-100) into the overall range
    pub fn parse_progress(&self, parse_percent: f64) -> f64 {
        let clamped = parse_percent.clamp(0.0, PROGRESS_COMPLETE);
        self.download_end + (self.parse_end - self.download_end) * clamped / PROGRESS_COMPLETE
    }

    /// Map a download fraction (0.0-1.0) into the overall range
    pub fn download_progress(&self, fraction: f64) -> f64 {
        self.download_end * fraction.clamp(0.0, 1.0)
    }

    pub fn is_valid(&self) -> bool {
        0.0 < self.download_end
            && self.download_end < self.parse_end
            && self.parse_end < PROGRESS_COMPLETE
    }
}

impl Default for ProgressSplit {
    fn default() -> Self {
        Self {
            download_end: DEFAULT_DOWNLOAD_PROGRESS_END,
            parse_end: DEFAULT_PARSE_PROGRESS_END,
        }
    }
}

/// Global configuration for the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Base URL of the API exposing the export and metadata endpoints
    pub api_base_url: String,

    /// Directory holding the persistent cache
    pub cache_dir: PathBuf,

    /// Maximum cache age used when a caller does not pass one
    pub default_max_age_minutes: u64,

    /// Rows per parse batch (one progress notification per batch)
    pub parse_batch_size: usize,

    /// Rows per row group when persisting records
    pub write_row_group_size: usize,

    pub progress_split: ProgressSplit,

    /// Timeout for a single request to the server
    pub request_timeout_secs: u64,

    pub version_marker: VersionMarkerStrategy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cache_dir: default_cache_dir(),
            default_max_age_minutes: DEFAULT_MAX_AGE_MINUTES,
            parse_batch_size: DEFAULT_PARSE_BATCH_SIZE,
            write_row_group_size: DEFAULT_WRITE_ROW_GROUP_SIZE,
            progress_split: ProgressSplit::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            version_marker: VersionMarkerStrategy::default(),
        }
    }
}

/// Platform cache directory, falling back to the working directory
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CACHE_DIR_NAME)
}

impl IngestConfig {
    /// Load configuration from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: IngestConfig = serde_json::from_str(&content).map_err(|e| {
            IngestError::configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `DASHBOARD_API_URL` / `DASHBOARD_CACHE_DIR` when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                self.cache_dir = PathBuf::from(dir);
            }
        }
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_parse_batch_size(mut self, batch_size: usize) -> Self {
        self.parse_batch_size = batch_size;
        self
    }

    pub fn with_write_row_group_size(mut self, rows: usize) -> Self {
        self.write_row_group_size = rows;
        self
    }

    pub fn with_progress_split(mut self, split: ProgressSplit) -> Self {
        self.progress_split = split;
        self
    }

    pub fn with_default_max_age(mut self, minutes: u64) -> Self {
        self.default_max_age_minutes = minutes;
        self
    }

    pub fn with_version_marker(mut self, strategy: VersionMarkerStrategy) -> Self {
        self.version_marker = strategy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.parse_batch_size == 0 {
            return Err(IngestError::configuration("parse_batch_size must be > 0"));
        }
        if self.write_row_group_size == 0 {
            return Err(IngestError::configuration(
                "write_row_group_size must be > 0",
            ));
        }
        if !self.progress_split.is_valid() {
            return Err(IngestError::configuration(format!(
                "progress split must satisfy 0 < download_end < parse_end < 100, got {:?}",
                self.progress_split
            )));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(IngestError::configuration("api_base_url is empty"));
        }
        Ok(())
    }
}
