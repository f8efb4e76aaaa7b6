//! Core data structures and types for dataset ingestion.
//!
//! Defines dataset kinds, decoded records, cache metadata, the server's
//! metadata probe payload and the observable per-dataset load state.

use crate::constants::{endpoints, store_keys};
use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The two large tables handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatasetKind {
    /// Bar transactions (`bar_zig`)
    Bar,
    /// Ticket sales (`vendas_ingresso`)
    TicketSales,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Bar, DatasetKind::TicketSales];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Bar => "bar",
            DatasetKind::TicketSales => "ticketSales",
        }
    }

    /// Stable name of the records partition
    pub fn records_key(&self) -> &'static str {
        match self {
            DatasetKind::Bar => store_keys::BAR_RECORDS,
            DatasetKind::TicketSales => store_keys::TICKET_SALES_RECORDS,
        }
    }

    /// Stable key of this dataset's entry in the metadata partition
    pub fn metadata_key(&self) -> &'static str {
        match self {
            DatasetKind::Bar => store_keys::BAR_METADATA,
            DatasetKind::TicketSales => store_keys::TICKET_SALES_METADATA,
        }
    }

    pub fn export_path(&self) -> &'static str {
        match self {
            DatasetKind::Bar => endpoints::BAR_EXPORT,
            DatasetKind::TicketSales => endpoints::TICKET_SALES_EXPORT,
        }
    }

    pub fn metadata_path(&self) -> &'static str {
        match self {
            DatasetKind::Bar => endpoints::BAR_METADATA,
            DatasetKind::TicketSales => endpoints::TICKET_SALES_METADATA,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bar" | "bar-zig" | "bar_zig" => Ok(DatasetKind::Bar),
            "ticketsales" | "ticket-sales" | "ticket_sales" | "vendas-ingresso"
            | "vendas_ingresso" => Ok(DatasetKind::TicketSales),
            _ => Err(IngestError::UnknownDataset {
                name: s.to_string(),
            }),
        }
    }
}

/// A decoded scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// One decoded row: field name to scalar
pub type Record = BTreeMap<String, Value>;

/// Undecoded export body for one dataset, moved into the parse worker
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub kind: DatasetKind,
    pub text: String,
}

impl RawPayload {
    pub fn new(kind: DatasetKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Staleness-tracking sidecar persisted next to each record collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    pub fetched_at_epoch_millis: i64,
    pub record_count: usize,
    /// Opaque server token, compared for equality only
    pub server_version_marker: String,
    /// Cache layout version; entries written before versioning read as 0
    #[serde(default)]
    pub schema_version: u32,
}

/// Payload of the server's metadata probe endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerMetadata {
    #[serde(default)]
    pub total_rows: Option<u64>,
    /// Epoch seconds
    #[serde(default)]
    pub last_modified: Option<f64>,
    #[serde(default)]
    pub file_size_mb: Option<f64>,
    #[serde(default)]
    pub file_size_kb: Option<f64>,
    #[serde(default)]
    pub csv_url: Option<String>,
}

/// States of the per-dataset ingestion state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadPhase {
    Idle,
    Deciding,
    CacheHit,
    Fetching,
    Parsing,
    Ready,
    Errored,
}

impl LoadPhase {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            LoadPhase::Deciding | LoadPhase::CacheHit | LoadPhase::Fetching | LoadPhase::Parsing
        )
    }
}

/// Observable state exposed to callers for one dataset
#[derive(Debug, Clone)]
pub struct DatasetState {
    pub kind: DatasetKind,
    pub phase: LoadPhase,
    pub records: Arc<Vec<Record>>,
    pub progress_percent: f64,
    pub error: Option<String>,
    /// Records are older than the requested max age (served after a failed refresh)
    pub stale: bool,
}

impl DatasetState {
    pub fn idle(kind: DatasetKind) -> Self {
        Self {
            kind,
            phase: LoadPhase::Idle,
            records: Arc::new(Vec::new()),
            progress_percent: 0.0,
            error: None,
            stale: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Options accepted by `get_data` / `load`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub max_age_minutes: u64,
}

impl LoadOptions {
    pub fn with_max_age(max_age_minutes: u64) -> Self {
        Self { max_age_minutes }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_age_minutes: crate::constants::DEFAULT_MAX_AGE_MINUTES,
        }
    }
}

/// Summary of what the cache holds for one dataset
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CacheInfo {
    NotLoaded,
    Cached {
        row_count: usize,
        loaded_at: String,
        server_version_marker: String,
        size_bytes: u64,
    },
}
