//! Dashboard Ingest Library
//!
//! Large-dataset ingestion pipeline for the sales dashboard. Downloads the
//! full CSV exports of the bar transactions and ticket sales tables, decodes
//! them on a background thread, and keeps a persistent local cache that is
//! only refreshed when it is missing, expired, or out of date with the
//! server.
//!
//! This library provides:
//! - A per-kind Record Decoder with silent, documented field defaults
//! - A Background Parser running each parse on its own worker thread
//! - A Persistent Cache Store with atomic, partitioned writes
//! - A Freshness Coordinator that checks local conditions before the network
//! - An Ingestion Orchestrator exposing observable load state per dataset
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dashboard_ingest::{
//!     CacheStore, DatasetKind, HttpExportSource, IngestConfig, IngestionOrchestrator,
//!     LoadOptions,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> dashboard_ingest::Result<()> {
//! let config = IngestConfig::default().with_env_overrides();
//! let orchestrator = IngestionOrchestrator::new(
//!     Arc::new(HttpExportSource::from_config(&config)?),
//!     CacheStore::open(&config.cache_dir)?,
//!     &config,
//! );
//!
//! let mut state = orchestrator.get_data(DatasetKind::TicketSales, LoadOptions::default());
//! while state.changed().await.is_ok() {
//!     let current = state.borrow_and_update().clone();
//!     if !current.is_loading() {
//!         println!("{} records", current.record_count());
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod freshness;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod source;

// Re-export commonly used types
pub use cache::CacheStore;
pub use config::{IngestConfig, ProgressSplit, VersionMarkerStrategy};
pub use error::{IngestError, Result};
pub use freshness::{FreshnessCoordinator, FreshnessDecision, RefetchReason};
pub use models::{
    CacheInfo, CacheMetadata, DatasetKind, DatasetState, LoadOptions, LoadPhase, RawPayload,
    Record, ServerMetadata, Value,
};
pub use orchestrator::IngestionOrchestrator;
pub use source::{ExportSource, HttpExportSource, MetadataProbe};
