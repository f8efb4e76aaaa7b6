//! Application constants for the ingestion pipeline
//!
//! Observed defaults carried over from the dashboard: parse batching,
//! the progress split between download, parse and persistence, and the
//! stable endpoint and storage names for each dataset.

// =============================================================================
// Parsing
// =============================================================================

/// Rows decoded between two progress notifications
pub const DEFAULT_PARSE_BATCH_SIZE: usize = 1000;

/// Rows per row group when persisting a record collection
pub const DEFAULT_WRITE_ROW_GROUP_SIZE: usize = 10_000;

/// Literal accepted as `true` by boolean-flag fields (after trim + lowercase)
pub const BOOLEAN_TRUE_LITERAL: &str = "true";

// =============================================================================
// Progress split (percent of overall progress)
// =============================================================================

/// Download occupies 0..DOWNLOAD_END
pub const DEFAULT_DOWNLOAD_PROGRESS_END: f64 = 30.0;

/// Parsing occupies DOWNLOAD_END..PARSE_END, persistence PARSE_END..100
pub const DEFAULT_PARSE_PROGRESS_END: f64 = 90.0;

pub const PROGRESS_COMPLETE: f64 = 100.0;

// =============================================================================
// Freshness and cache layout
// =============================================================================

/// Default maximum cache age before a refetch is forced
pub const DEFAULT_MAX_AGE_MINUTES: u64 = 60;

pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Bumped whenever the on-disk record layout changes
pub const CACHE_SCHEMA_VERSION: u32 = 2;

/// File holding the `{key -> CacheMetadata}` partition
pub const METADATA_FILE_NAME: &str = "metadata.json";

pub const RECORDS_FILE_EXTENSION: &str = "parquet";

pub const CACHE_DIR_NAME: &str = "dashboard-ingest";

// =============================================================================
// Server collaborator
// =============================================================================

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Upper bound on the buffer reserved up front from `Content-Length`
pub const MAX_DOWNLOAD_PREALLOCATION_BYTES: u64 = 64 * 1024 * 1024;

pub const ENV_API_BASE_URL: &str = "DASHBOARD_API_URL";

pub const ENV_CACHE_DIR: &str = "DASHBOARD_CACHE_DIR";

pub mod endpoints {
    pub const BAR_EXPORT: &str = "/csv/bar-zig";
    pub const BAR_METADATA: &str = "/csv/bar-zig/metadata";
    pub const TICKET_SALES_EXPORT: &str = "/csv/vendas-ingresso";
    pub const TICKET_SALES_METADATA: &str = "/csv/vendas-ingresso/metadata";
}

pub mod store_keys {
    pub const BAR_RECORDS: &str = "bar_zig";
    pub const BAR_METADATA: &str = "bar_zig_metadata";
    pub const TICKET_SALES_RECORDS: &str = "vendas_ingresso";
    pub const TICKET_SALES_METADATA: &str = "vendas_ingresso_metadata";
}
