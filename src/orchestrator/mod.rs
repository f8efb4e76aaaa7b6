//! Ingestion Orchestrator
//!
//! Public entry point for dataset consumers. Per dataset kind it runs the
//! state machine
//!
//! ```text
//! Idle -> Deciding -> CacheHit -> Ready
//!                  \-> Fetching -> Parsing -> Ready
//! (Deciding | Fetching | Parsing) -> Errored
//! ```
//!
//! sequencing the freshness decision, the export download, the background
//! parse and the cache write, and publishes a [`DatasetState`] on a watch
//! channel after every transition.
//!
//! ## Architecture
//!
//! - One [`slot::DatasetSlot`] per kind. Its cycle lock serializes cycles so
//!   a second `load` / `refetch` while busy joins the in-flight cycle instead
//!   of starting another one. Kinds are fully independent.
//! - `cancel` / `clear_cache` bump the slot generation. A cycle stops at its
//!   next await point and never publishes state for an old generation.
//! - Every parse is tagged with a fresh token; events from any other token
//!   are dropped.
//! - Persistence (90-100%) is not interruptible, so a cancelled cycle never
//!   leaves records without their metadata half-way through a clear.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dashboard_ingest::cache::CacheStore;
//! use dashboard_ingest::config::IngestConfig;
//! use dashboard_ingest::models::{DatasetKind, LoadOptions};
//! use dashboard_ingest::orchestrator::IngestionOrchestrator;
//! use dashboard_ingest::source::HttpExportSource;
//! use std::sync::Arc;
//!
//! # async fn example() -> dashboard_ingest::Result<()> {
//! let config = IngestConfig::default();
//! let source = Arc::new(HttpExportSource::from_config(&config)?);
//! let store = CacheStore::open(&config.cache_dir)?;
//! let orchestrator = IngestionOrchestrator::new(source, store, &config);
//!
//! let state = orchestrator
//!     .load(DatasetKind::Bar, LoadOptions::with_max_age(30))
//!     .await;
//! println!("{:?}: {} records", state.phase, state.record_count());
//! # Ok(())
//! # }
//! ```

pub(crate) mod slot;

#[cfg(test)]
mod tests;

pub use slot::EventOutcome;

use crate::cache::CacheStore;
use crate::config::{IngestConfig, ProgressSplit};
use crate::constants::CACHE_SCHEMA_VERSION;
use crate::decoder::FieldRules;
use crate::error::{IngestError, Result};
use crate::freshness::{FreshnessCoordinator, FreshnessDecision, RefetchReason};
use crate::models::{
    CacheInfo, CacheMetadata, DatasetKind, DatasetState, LoadOptions, LoadPhase, Record,
};
use crate::parser::BackgroundParser;
use crate::source::ExportSource;
use slot::DatasetSlot;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

enum CycleMode {
    /// Consult the Freshness Coordinator first
    Decide { max_age_minutes: u64 },
    /// Caller asked for fresh data
    Forced,
}

enum CycleError {
    Cancelled,
    Failed(IngestError),
}

impl From<IngestError> for CycleError {
    fn from(err: IngestError) -> Self {
        CycleError::Failed(err)
    }
}

type CycleResult<T> = std::result::Result<T, CycleError>;

struct Inner<S> {
    source: Arc<S>,
    store: CacheStore,
    freshness: FreshnessCoordinator<S>,
    parser: BackgroundParser,
    split: ProgressSplit,
    default_max_age_minutes: u64,
    bar: DatasetSlot,
    ticket_sales: DatasetSlot,
    next_token: AtomicU64,
}

/// Cheap to clone; clones share slots, store and source
pub struct IngestionOrchestrator<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for IngestionOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ExportSource + 'static> IngestionOrchestrator<S> {
    pub fn new(source: Arc<S>, store: CacheStore, config: &IngestConfig) -> Self {
        let freshness =
            FreshnessCoordinator::new(store.clone(), Arc::clone(&source), config.version_marker);
        let inner = Inner {
            source,
            store,
            freshness,
            parser: BackgroundParser::new(config.parse_batch_size),
            split: config.progress_split,
            default_max_age_minutes: config.default_max_age_minutes,
            bar: DatasetSlot::new(DatasetKind::Bar),
            ticket_sales: DatasetSlot::new(DatasetKind::TicketSales),
            next_token: AtomicU64::new(1),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    fn slot(&self, kind: DatasetKind) -> &DatasetSlot {
        match kind {
            DatasetKind::Bar => &self.inner.bar,
            DatasetKind::TicketSales => &self.inner.ticket_sales,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    /// Options carrying the configured default max age
    pub fn default_options(&self) -> LoadOptions {
        LoadOptions::with_max_age(self.inner.default_max_age_minutes)
    }

    pub fn state(&self, kind: DatasetKind) -> DatasetState {
        self.slot(kind).snapshot()
    }

    pub fn subscribe(&self, kind: DatasetKind) -> watch::Receiver<DatasetState> {
        self.slot(kind).subscribe()
    }

    /// Subscribe to `kind`, starting a load in the background unless one is
    /// already running or the last one failed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_data(&self, kind: DatasetKind, options: LoadOptions) -> watch::Receiver<DatasetState> {
        let receiver = self.subscribe(kind);
        let phase = receiver.borrow().phase;
        if matches!(phase, LoadPhase::Idle | LoadPhase::Ready) {
            let orchestrator = self.clone();
            tokio::spawn(async move {
                orchestrator.load(kind, options).await;
            });
        }
        receiver
    }

    /// Run one freshness-checked cycle and return the resulting state
    pub async fn load(&self, kind: DatasetKind, options: LoadOptions) -> DatasetState {
        self.run_cycle(
            kind,
            CycleMode::Decide {
                max_age_minutes: options.max_age_minutes,
            },
        )
        .await
    }

    /// Fetch, parse and persist regardless of cache freshness
    pub async fn refetch(&self, kind: DatasetKind) -> DatasetState {
        self.run_cycle(kind, CycleMode::Forced).await
    }

    /// Discard the in-flight cycle for `kind`, if any, and return to `Idle`
    pub fn cancel(&self, kind: DatasetKind) {
        self.slot(kind).invalidate(|state| {
            if state.is_loading() {
                state.phase = LoadPhase::Idle;
                state.progress_percent = 0.0;
                state.error = None;
            }
        });
        info!("{}: load cancelled", kind);
    }

    /// Empty the persistent cache for `kind` and reset to `Idle`
    pub async fn clear_cache(&self, kind: DatasetKind) -> Result<()> {
        let slot = self.slot(kind);
        slot.invalidate(|state| *state = DatasetState::idle(kind));
        let _cycle = slot.cycle.lock().await;

        slot.set_served_marker(None);
        let cleared = self.inner.store.clear(kind).await;
        slot.invalidate(|state| *state = DatasetState::idle(kind));
        cleared
    }

    pub async fn cache_info(&self, kind: DatasetKind) -> Result<CacheInfo> {
        self.inner.store.info(kind).await
    }

    async fn run_cycle(&self, kind: DatasetKind, mode: CycleMode) -> DatasetState {
        let slot = self.slot(kind);
        let _cycle = match slot.cycle.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("{}: cycle already running, joining it", kind);
                let guard = slot.cycle.lock().await;
                // A cancelled cycle leaves Idle behind; anything else is its result
                if slot.snapshot().phase != LoadPhase::Idle {
                    return slot.snapshot();
                }
                guard
            }
        };

        let generation = slot.generation();
        match self.drive(slot, generation, mode).await {
            Ok(()) => {}
            Err(CycleError::Cancelled) => debug!("{}: cycle {} cancelled", kind, generation),
            Err(CycleError::Failed(err)) => self.fail(slot, generation, err).await,
        }
        slot.snapshot()
    }

    async fn drive(&self, slot: &DatasetSlot, generation: u64, mode: CycleMode) -> CycleResult<()> {
        let kind = slot.kind();
        publish(slot, generation, |state| {
            state.phase = LoadPhase::Deciding;
            state.progress_percent = 0.0;
            state.error = None;
        })?;

        let decision = match mode {
            CycleMode::Decide { max_age_minutes } => {
                let decision = until_cancelled(
                    slot,
                    generation,
                    self.inner.freshness.decide(kind, max_age_minutes),
                )
                .await?;
                info!("{}: {}", kind, decision.reason);
                Some(decision)
            }
            CycleMode::Forced => {
                info!("{}: refetch requested", kind);
                None
            }
        };

        if let Some(decision) = &decision {
            if !decision.refetch && self.serve_cache(slot, generation, decision).await? {
                return Ok(());
            }
            if decision.reason == RefetchReason::SchemaChanged {
                if let Err(e) = self.inner.store.clear(kind).await {
                    warn!("{}: could not clear outdated cache: {}", kind, e);
                }
            }
        }

        // Marker taken before the download so it never describes newer rows
        let marker = match decision.and_then(|decision| decision.server_marker) {
            Some(marker) => marker,
            None => until_cancelled(slot, generation, self.inner.freshness.current_marker(kind))
                .await?
                .unwrap_or_default(),
        };

        let records = self.fetch_and_parse(slot, generation).await?;

        publish(slot, generation, |state| {
            state.progress_percent = state.progress_percent.max(self.inner.split.parse_end);
        })?;
        self.persist(kind, Arc::clone(&records), &marker).await;
        slot.set_served_marker(Some(marker));

        publish_ready(slot, generation, records)
    }

    /// `Deciding -> CacheHit -> Ready`; `Ok(false)` when the cache turned out unusable
    async fn serve_cache(
        &self,
        slot: &DatasetSlot,
        generation: u64,
        decision: &FreshnessDecision,
    ) -> CycleResult<bool> {
        let kind = slot.kind();
        publish(slot, generation, |state| state.phase = LoadPhase::CacheHit)?;

        let expected = decision.cached_record_count.unwrap_or(0);
        let current = slot.snapshot();
        let reusable = expected > 0
            && !current.stale
            && current.record_count() == expected
            && slot.served_marker() == decision.server_marker;

        let records = if reusable {
            debug!("{}: records already in memory", kind);
            current.records
        } else {
            match until_cancelled(slot, generation, self.inner.store.read(kind)).await? {
                Ok(records) if records.len() == expected => Arc::new(records),
                Ok(records) => {
                    warn!(
                        "{}: cache holds {} records, metadata says {}; refetching",
                        kind,
                        records.len(),
                        expected
                    );
                    return Ok(false);
                }
                Err(e) => {
                    warn!("{}: cache read failed, refetching: {}", kind, e);
                    return Ok(false);
                }
            }
        };

        slot.set_served_marker(decision.server_marker.clone());
        info!("{}: serving {} cached records", kind, records.len());
        publish_ready(slot, generation, records)?;
        Ok(true)
    }

    /// `Fetching -> Parsing`
    async fn fetch_and_parse(
        &self,
        slot: &DatasetSlot,
        generation: u64,
    ) -> CycleResult<Arc<Vec<Record>>> {
        let kind = slot.kind();
        let split = self.inner.split;

        publish(slot, generation, |state| {
            state.phase = LoadPhase::Fetching;
            state.progress_percent = 0.0;
        })?;
        let on_progress = |fraction: f64| {
            slot.advance(generation, split.download_progress(fraction));
        };
        let payload = until_cancelled(
            slot,
            generation,
            self.inner.source.fetch_export(kind, &on_progress),
        )
        .await??;
        info!("{}: downloaded {} bytes", kind, payload.len());

        let token = self.inner.next_token.fetch_add(1, Ordering::SeqCst);
        let mut handle = self
            .inner
            .parser
            .spawn(payload, FieldRules::for_kind(kind), token)?;
        slot.begin_parse(token, handle.cancel_flag());
        let parsed = publish(slot, generation, |state| {
            state.phase = LoadPhase::Parsing;
            state.progress_percent = state.progress_percent.max(split.download_end);
        });
        if let Err(cancelled) = parsed {
            slot.end_parse(token);
            return Err(cancelled);
        }

        let outcome = loop {
            let event = match until_cancelled(slot, generation, handle.next_event()).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    break Err(IngestError::parse_failure(
                        kind,
                        "worker exited without a result",
                    )
                    .into());
                }
                Err(cancelled) => break Err(cancelled),
            };
            match slot.handle_event(event, &split) {
                EventOutcome::Ignored => continue,
                EventOutcome::Progress(percent) => {
                    slot.advance(generation, percent);
                }
                EventOutcome::Completed(records) => break Ok(records),
                EventOutcome::Failed(message) => {
                    break Err(IngestError::parse_failure(kind, message).into());
                }
            }
        };
        slot.end_parse(token);

        let records = outcome?;
        info!("{}: parsed {} records", kind, records.len());
        Ok(Arc::new(records))
    }

    /// Records first, metadata last; failures are logged and absorbed
    async fn persist(&self, kind: DatasetKind, records: Arc<Vec<Record>>, marker: &str) {
        let metadata = CacheMetadata {
            fetched_at_epoch_millis: chrono::Utc::now().timestamp_millis(),
            record_count: records.len(),
            server_version_marker: marker.to_string(),
            schema_version: CACHE_SCHEMA_VERSION,
        };

        if let Err(e) = self.inner.store.write(kind, records).await {
            warn!("{}: cache write failed, records not persisted: {}", kind, e);
            return;
        }
        if let Err(e) = self
            .inner
            .store
            .write_metadata(kind.metadata_key(), metadata)
            .await
        {
            warn!("{}: cache metadata write failed: {}", kind, e);
            return;
        }
        debug!("{}: cache updated (marker {:?})", kind, marker);
    }

    /// Terminal failure; keeps previously available records visible as stale
    async fn fail(&self, slot: &DatasetSlot, generation: u64, err: IngestError) {
        let kind = slot.kind();
        error!("{}: ingestion failed: {}", kind, err);

        let current = slot.snapshot().records;
        let fallback = if !current.is_empty() {
            Some(current)
        } else {
            match self.inner.store.read(kind).await {
                Ok(records) if !records.is_empty() => Some(Arc::new(records)),
                _ => None,
            }
        };

        slot.update(generation, |state| {
            state.phase = LoadPhase::Errored;
            state.error = Some(err.to_string());
            match fallback {
                Some(records) => {
                    state.records = records;
                    state.stale = true;
                }
                None => {
                    state.records = Arc::new(Vec::new());
                    state.stale = false;
                }
            }
        });
    }
}

fn publish<F>(slot: &DatasetSlot, generation: u64, f: F) -> CycleResult<()>
where
    F: FnOnce(&mut DatasetState),
{
    if slot.update(generation, f) {
        Ok(())
    } else {
        Err(CycleError::Cancelled)
    }
}

fn publish_ready(
    slot: &DatasetSlot,
    generation: u64,
    records: Arc<Vec<Record>>,
) -> CycleResult<()> {
    publish(slot, generation, |state| {
        state.phase = LoadPhase::Ready;
        state.progress_percent = crate::constants::PROGRESS_COMPLETE;
        state.records = records;
        state.error = None;
        state.stale = false;
    })
}

/// Await `future` unless the slot generation moves on first
async fn until_cancelled<F: Future>(
    slot: &DatasetSlot,
    generation: u64,
    future: F,
) -> CycleResult<F::Output> {
    let mut generations = slot.watch_generation();
    tokio::select! {
        output = future => Ok(output),
        _ = generations.wait_for(|current| *current != generation) => Err(CycleError::Cancelled),
    }
}
