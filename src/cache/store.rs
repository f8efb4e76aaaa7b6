//! Async, partitioned cache operations
//!
//! File I/O and frame conversion run on the blocking pool so callers on the
//! async runtime are never stalled by a multi-million row write.

use super::frame::{frame_to_records, records_to_frame};
use crate::constants::{METADATA_FILE_NAME, RECORDS_FILE_EXTENSION};
use crate::error::{IngestError, Result};
use crate::models::{CacheInfo, CacheMetadata, DatasetKind, Record};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

type MetadataPartition = BTreeMap<String, CacheMetadata>;

/// Durable key/value store partitioned by dataset kind
///
/// Constructed explicitly and shared by handle; two stores opened on the
/// same directory (e.g. two processes) race with last-writer-wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    row_group_size: usize,
    metadata_lock: Arc<Mutex<()>>,
}

impl CacheStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            IngestError::storage(format!(
                "cannot create cache directory {}: {}",
                root.display(),
                e
            ))
        })?;
        debug!("Cache store opened at {}", root.display());
        Ok(Self {
            root,
            row_group_size: crate::constants::DEFAULT_WRITE_ROW_GROUP_SIZE,
            metadata_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn with_row_group_size(mut self, rows: usize) -> Self {
        self.row_group_size = rows.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records_path(&self, kind: DatasetKind) -> PathBuf {
        self.root
            .join(format!("{}.{}", kind.records_key(), RECORDS_FILE_EXTENSION))
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE_NAME)
    }

    /// Records currently stored for `kind`; empty when none exist
    pub async fn read(&self, kind: DatasetKind) -> Result<Vec<Record>> {
        let path = self.records_path(kind);
        run_blocking(move || read_records_file(&path)).await
    }

    /// Replace the whole collection for `kind`
    pub async fn write(&self, kind: DatasetKind, records: Arc<Vec<Record>>) -> Result<()> {
        let path = self.records_path(kind);
        let dir = self.root.clone();
        let row_group_size = self.row_group_size;
        run_blocking(move || write_records_file(&dir, &path, &records, row_group_size)).await?;
        debug!("Cache records written for {}", kind);
        Ok(())
    }

    pub async fn read_metadata(&self, key: &str) -> Result<Option<CacheMetadata>> {
        let path = self.metadata_path();
        let key = key.to_string();
        let lock = Arc::clone(&self.metadata_lock);
        run_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Ok(load_partition(&path)?.remove(&key))
        })
        .await
    }

    pub async fn write_metadata(&self, key: &str, metadata: CacheMetadata) -> Result<()> {
        let path = self.metadata_path();
        let dir = self.root.clone();
        let key = key.to_string();
        let lock = Arc::clone(&self.metadata_lock);
        run_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut partition = load_partition(&path)?;
            partition.insert(key, metadata);
            save_partition(&dir, &path, &partition)
        })
        .await
    }

    /// Empty both the records and the metadata for `kind`
    pub async fn clear(&self, kind: DatasetKind) -> Result<()> {
        let records_path = self.records_path(kind);
        let metadata_path = self.metadata_path();
        let dir = self.root.clone();
        let key = kind.metadata_key().to_string();
        let lock = Arc::clone(&self.metadata_lock);
        run_blocking(move || {
            remove_if_exists(&records_path)?;
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut partition = load_partition(&metadata_path)?;
            if partition.remove(&key).is_some() {
                save_partition(&dir, &metadata_path, &partition)?;
            }
            Ok(())
        })
        .await?;
        info!("Cache cleared for {}", kind);
        Ok(())
    }

    /// What the cache holds for `kind`
    pub async fn info(&self, kind: DatasetKind) -> Result<CacheInfo> {
        let Some(metadata) = self.read_metadata(kind.metadata_key()).await? else {
            return Ok(CacheInfo::NotLoaded);
        };
        let size_bytes = match tokio::fs::metadata(self.records_path(kind)).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        let loaded_at = chrono::DateTime::from_timestamp_millis(metadata.fetched_at_epoch_millis)
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| metadata.fetched_at_epoch_millis.to_string());

        Ok(CacheInfo::Cached {
            row_count: metadata.record_count,
            loaded_at,
            server_version_marker: metadata.server_version_marker,
            size_bytes,
        })
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| IngestError::storage(format!("cache task failed: {}", e)))?
}

fn read_records_file(path: &Path) -> Result<Vec<Record>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let frame = ParquetReader::new(file).finish()?;
    frame_to_records(&frame)
}

fn write_records_file(
    dir: &Path,
    path: &Path,
    records: &[Record],
    row_group_size: usize,
) -> Result<()> {
    if records.is_empty() {
        return remove_if_exists(path);
    }

    let mut frame = records_to_frame(records)?;
    persist_atomically(dir, path, |file| {
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .with_row_group_size(Some(row_group_size))
            .finish(&mut frame)?;
        Ok(())
    })
}

fn load_partition(path: &Path) -> Result<MetadataPartition> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(MetadataPartition::new()),
        Err(e) => Err(e.into()),
    }
}

fn save_partition(dir: &Path, path: &Path, partition: &MetadataPartition) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(partition)?;
    persist_atomically(dir, path, |file| {
        std::io::Write::write_all(file, &bytes)?;
        Ok(())
    })
}

/// Write through a temp file in `dir`, then rename over `target`
fn persist_atomically<F>(dir: &Path, target: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    write(temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| IngestError::Io(e.error))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
