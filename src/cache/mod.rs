//! Persistent cache store for decoded record collections
//!
//! One records partition per dataset kind (a Parquet file) plus a single
//! metadata partition (`metadata.json`, `{key -> CacheMetadata}`). Every
//! write goes to a temporary file in the cache directory and is renamed into
//! place, so a concurrent reader sees either the old collection or the new
//! one, never a mix. The last writer wins.
//!
//! - [`store`] - async partitioned operations
//! - [`frame`] - record collection to columnar frame conversion

pub mod frame;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::CacheStore;
