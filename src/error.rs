//! Error handling for ingestion operations.
//!
//! Provides the error taxonomy for transport, parsing and storage failures.
//! Per-field decode fallbacks are not errors and never appear here.

use crate::models::DatasetKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport error for {kind}: {message}")]
    Transport { kind: DatasetKind, message: String },

    #[error("Failed to parse {kind} payload: {reason}")]
    ParseFailure { kind: DatasetKind, reason: String },

    #[error("Cache storage error: {reason}")]
    Storage { reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown dataset: {name}")]
    UnknownDataset { name: String },

    #[error("Parse worker for {kind} unavailable: {reason}")]
    WorkerUnavailable { kind: DatasetKind, reason: String },
}

impl IngestError {
    pub fn transport(kind: DatasetKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn parse_failure(kind: DatasetKind, reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            kind,
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for failures of the persistent cache, which callers absorb by
    /// treating the cache as absent.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Polars(_) | Self::Json(_) | Self::Storage { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
