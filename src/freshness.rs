//! Freshness Coordinator
//!
//! Decides per dataset and per access whether cached records may be served
//! as-is. Cheap local checks (metadata presence, layout version, age) run
//! first; the server probe is only consulted when they all pass, so a fresh
//! cache never costs more than one small metadata request and an expired one
//! costs none.

use crate::cache::CacheStore;
use crate::config::VersionMarkerStrategy;
use crate::constants::{CACHE_SCHEMA_VERSION, MILLIS_PER_MINUTE};
use crate::models::DatasetKind;
use crate::source::MetadataProbe;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why the coordinator decided the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchReason {
    NoMetadata,
    /// Metadata could not be read; treated as absent
    StorageUnavailable,
    SchemaChanged,
    Expired,
    ProbeFailed,
    MarkerChanged,
    /// Cache may be served
    Fresh,
}

impl fmt::Display for RefetchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RefetchReason::NoMetadata => "no cached metadata",
            RefetchReason::StorageUnavailable => "cache storage unavailable",
            RefetchReason::SchemaChanged => "cache layout changed",
            RefetchReason::Expired => "cache older than max age",
            RefetchReason::ProbeFailed => "server metadata probe failed",
            RefetchReason::MarkerChanged => "server data changed",
            RefetchReason::Fresh => "cache is fresh",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshnessDecision {
    pub refetch: bool,
    pub reason: RefetchReason,
    /// Marker reported by the probe, when the probe was consulted and succeeded
    pub server_marker: Option<String>,
    /// Record count from the cached metadata, set when the cache is fresh
    pub cached_record_count: Option<usize>,
}

impl FreshnessDecision {
    fn refetch(reason: RefetchReason, server_marker: Option<String>) -> Self {
        Self {
            refetch: true,
            reason,
            server_marker,
            cached_record_count: None,
        }
    }
}

pub struct FreshnessCoordinator<P> {
    store: CacheStore,
    probe: Arc<P>,
    marker_strategy: VersionMarkerStrategy,
}

impl<P: MetadataProbe> FreshnessCoordinator<P> {
    pub fn new(store: CacheStore, probe: Arc<P>, marker_strategy: VersionMarkerStrategy) -> Self {
        Self {
            store,
            probe,
            marker_strategy,
        }
    }

    pub async fn should_refetch(&self, kind: DatasetKind, max_age_minutes: u64) -> bool {
        self.decide(kind, max_age_minutes).await.refetch
    }

    pub async fn decide(&self, kind: DatasetKind, max_age_minutes: u64) -> FreshnessDecision {
        let now = chrono::Utc::now().timestamp_millis();
        self.decide_at(kind, max_age_minutes, now).await
    }

    /// First match wins:
    /// 1. no metadata (or unreadable) -> refetch
    /// 2. layout version differs -> refetch
    /// 3. older than `max_age_minutes` -> refetch
    /// 4. probe fails or yields no marker -> refetch
    /// 5. marker differs -> refetch
    /// 6. otherwise serve the cache
    pub async fn decide_at(
        &self,
        kind: DatasetKind,
        max_age_minutes: u64,
        now_epoch_millis: i64,
    ) -> FreshnessDecision {
        let metadata = match self.store.read_metadata(kind.metadata_key()).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => {
                debug!("{}: no cached metadata", kind);
                return FreshnessDecision::refetch(RefetchReason::NoMetadata, None);
            }
            Err(e) => {
                warn!("{}: cache metadata unreadable, treating as absent: {}", kind, e);
                return FreshnessDecision::refetch(RefetchReason::StorageUnavailable, None);
            }
        };

        if metadata.schema_version != CACHE_SCHEMA_VERSION {
            debug!(
                "{}: cache layout v{} != v{}",
                kind, metadata.schema_version, CACHE_SCHEMA_VERSION
            );
            return FreshnessDecision::refetch(RefetchReason::SchemaChanged, None);
        }

        let max_age_millis = i64::try_from(max_age_minutes)
            .unwrap_or(i64::MAX)
            .saturating_mul(MILLIS_PER_MINUTE);
        let age_millis = now_epoch_millis.saturating_sub(metadata.fetched_at_epoch_millis);
        if age_millis > max_age_millis {
            debug!(
                "{}: cache age {}ms exceeds {}ms",
                kind, age_millis, max_age_millis
            );
            return FreshnessDecision::refetch(RefetchReason::Expired, None);
        }

        let Some(server_marker) = self.current_marker(kind).await else {
            return FreshnessDecision::refetch(RefetchReason::ProbeFailed, None);
        };

        if server_marker != metadata.server_version_marker {
            debug!(
                "{}: server marker {} != cached {}",
                kind, server_marker, metadata.server_version_marker
            );
            return FreshnessDecision::refetch(RefetchReason::MarkerChanged, Some(server_marker));
        }

        debug!("{}: cache is fresh ({} records)", kind, metadata.record_count);
        FreshnessDecision {
            refetch: false,
            reason: RefetchReason::Fresh,
            server_marker: Some(server_marker),
            cached_record_count: Some(metadata.record_count),
        }
    }

    /// Probe the server and derive its version marker
    pub async fn current_marker(&self, kind: DatasetKind) -> Option<String> {
        match self.probe.probe(kind).await {
            Ok(metadata) => {
                let marker = self.marker_strategy.marker_for(&metadata);
                if marker.is_none() {
                    warn!(
                        "{}: metadata probe lacks fields for {:?} marker",
                        kind, self.marker_strategy
                    );
                }
                marker
            }
            Err(e) => {
                warn!("{}: metadata probe failed: {}", kind, e);
                None
            }
        }
    }
}
