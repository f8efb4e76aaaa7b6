//! Tests for the ingestion orchestrator
//!
//! - [`lifecycle_tests`] - state machine paths, persistence and failures
//! - [`concurrency_tests`] - serialization, cancellation and stale tokens


use crate::cache::CacheStore;
use crate::config::IngestConfig;
use crate::models::{DatasetKind, DatasetState};
use crate::orchestrator::IngestionOrchestrator;
use crate::source::fake::FakeSource;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

/// Three bar rows, one with malformed numeric fields
pub const BAR_EXPORT: &str = "transactionId,count,unitValue,isRefunded,productName\n\
t1,2,10.50,false,Cerveja\n\
t2,,abc,TRUE,\"Agua, sem gas\"\n\
t3,1,3.25,no,Refrigerante\n";

pub const TICKET_EXPORT: &str = "pedido,quantidade,valor_liquido,setor\n\
p1,2,180.00,Pista\n\
p2,1,95.50,Camarote\n";

pub struct Harness {
    pub dir: TempDir,
    pub source: Arc<FakeSource>,
    pub orchestrator: IngestionOrchestrator<FakeSource>,
}

impl Harness {
    pub fn new(source: FakeSource) -> Self {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(source);
        let orchestrator = orchestrator_on(&dir, &source);
        Self {
            dir,
            source,
            orchestrator,
        }
    }

    /// Second orchestrator over the same cache directory, as after a restart
    pub fn restarted(&self) -> IngestionOrchestrator<FakeSource> {
        orchestrator_on(&self.dir, &self.source)
    }

    pub fn store(&self) -> &CacheStore {
        self.orchestrator.store()
    }
}

fn orchestrator_on(dir: &TempDir, source: &Arc<FakeSource>) -> IngestionOrchestrator<FakeSource> {
    let config = IngestConfig::default()
        .with_cache_dir(dir.path())
        .with_parse_batch_size(1);
    let store = CacheStore::open(&config.cache_dir).unwrap();
    IngestionOrchestrator::new(Arc::clone(source), store, &config)
}

pub fn bar_source() -> FakeSource {
    FakeSource::new()
        .with_export(DatasetKind::Bar, BAR_EXPORT, 3)
        .with_export(DatasetKind::TicketSales, TICKET_EXPORT, 2)
}

/// Wait until the observed state satisfies `predicate`
pub async fn wait_until<F>(receiver: &mut watch::Receiver<DatasetState>, predicate: F) -> DatasetState
where
    F: FnMut(&DatasetState) -> bool,
{
    let state = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        receiver.wait_for(predicate),
    )
    .await
    .expect("state not reached in time")
    .expect("state channel closed");
    state.clone()
}
