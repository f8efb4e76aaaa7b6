//! Partitioned store behaviour on a temporary directory

use super::bar_records;
use crate::cache::CacheStore;
use crate::models::{CacheInfo, CacheMetadata, DatasetKind};
use std::sync::Arc;
use tempfile::TempDir;

fn metadata(count: usize, marker: &str) -> CacheMetadata {
    CacheMetadata {
        fetched_at_epoch_millis: 1_700_000_000_000,
        record_count: count,
        server_version_marker: marker.to_string(),
        schema_version: crate::constants::CACHE_SCHEMA_VERSION,
    }
}

#[tokio::test]
async fn test_read_of_empty_store_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path()).unwrap();

    assert!(store.read(DatasetKind::Bar).await.unwrap().is_empty());
    assert!(
        store
            .read_metadata(DatasetKind::Bar.metadata_key())
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        store.info(DatasetKind::Bar).await.unwrap(),
        CacheInfo::NotLoaded
    ));
}

#[tokio::test]
async fn test_write_then_read_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path())
        .unwrap()
        .with_row_group_size(7);
    let records = bar_records(40);

    store
        .write(DatasetKind::Bar, Arc::new(records.clone()))
        .await
        .unwrap();

    assert_eq!(store.read(DatasetKind::Bar).await.unwrap(), records);
    assert!(store.records_path(DatasetKind::Bar).exists());
}

#[tokio::test]
async fn test_write_replaces_previous_collection() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path()).unwrap();

    store
        .write(DatasetKind::Bar, Arc::new(bar_records(30)))
        .await
        .unwrap();
    store
        .write(DatasetKind::Bar, Arc::new(bar_records(3)))
        .await
        .unwrap();

    assert_eq!(store.read(DatasetKind::Bar).await.unwrap(), bar_records(3));
}

#[tokio::test]
async fn test_empty_write_leaves_empty_collection() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path()).unwrap();

    store
        .write(DatasetKind::TicketSales, Arc::new(bar_records(5)))
        .await
        .unwrap();
    store
        .write(DatasetKind::TicketSales, Arc::new(Vec::new()))
        .await
        .unwrap();

    assert!(store.read(DatasetKind::TicketSales).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_partitions_are_independent() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path()).unwrap();

    store
        .write(DatasetKind::Bar, Arc::new(bar_records(10)))
        .await
        .unwrap();
    store
        .write_metadata(DatasetKind::Bar.metadata_key(), metadata(10, "10"))
        .await
        .unwrap();
    store
        .write_metadata(DatasetKind::TicketSales.metadata_key(), metadata(4, "4"))
        .await
        .unwrap();

    assert!(store.read(DatasetKind::TicketSales).await.unwrap().is_empty());
    let bar = store
        .read_metadata(DatasetKind::Bar.metadata_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bar.server_version_marker, "10");

    store.clear(DatasetKind::TicketSales).await.unwrap();
    assert!(
        store
            .read_metadata(DatasetKind::TicketSales.metadata_key())
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(store.read(DatasetKind::Bar).await.unwrap().len(), 10);
    assert!(
        store
            .read_metadata(DatasetKind::Bar.metadata_key())
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_clear_empties_records_and_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path()).unwrap();

    store
        .write(DatasetKind::Bar, Arc::new(bar_records(8)))
        .await
        .unwrap();
    store
        .write_metadata(DatasetKind::Bar.metadata_key(), metadata(8, "8"))
        .await
        .unwrap();
    store.clear(DatasetKind::Bar).await.unwrap();

    assert!(store.read(DatasetKind::Bar).await.unwrap().is_empty());
    assert!(
        store
            .read_metadata(DatasetKind::Bar.metadata_key())
            .await
            .unwrap()
            .is_none()
    );
    // clearing twice is harmless
    store.clear(DatasetKind::Bar).await.unwrap();
}

#[tokio::test]
async fn test_info_reports_cached_collection() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path()).unwrap();

    store
        .write(DatasetKind::Bar, Arc::new(bar_records(12)))
        .await
        .unwrap();
    store
        .write_metadata(DatasetKind::Bar.metadata_key(), metadata(12, "12"))
        .await
        .unwrap();

    match store.info(DatasetKind::Bar).await.unwrap() {
        CacheInfo::Cached {
            row_count,
            server_version_marker,
            size_bytes,
            loaded_at,
        } => {
            assert_eq!(row_count, 12);
            assert_eq!(server_version_marker, "12");
            assert!(size_bytes > 0);
            assert!(loaded_at.starts_with("2023-11-14"));
        }
        CacheInfo::NotLoaded => panic!("expected cached info"),
    }
}

#[tokio::test]
async fn test_corrupt_metadata_surfaces_storage_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::open(temp_dir.path()).unwrap();
    std::fs::write(temp_dir.path().join("metadata.json"), "{ truncated").unwrap();

    let err = store
        .read_metadata(DatasetKind::Bar.metadata_key())
        .await
        .unwrap_err();
    assert!(err.is_storage());
}
