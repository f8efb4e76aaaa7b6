//! Record decoder for dataset export rows
//!
//! Turns one delimited text row into a typed [`Record`](crate::models::Record)
//! for a given dataset kind. Decoding never fails: a field that cannot be
//! coerced takes its documented default so one malformed value cannot abort
//! the ingestion of the remaining rows.
//!
//! ## Architecture
//!
//! - [`rules`] - per-dataset coercion tables
//! - [`field_parsers`] - lenient scalar coercions with defaults
//! - [`record_decoder`] - quote-aware splitting and row assembly
//!
//! ## Usage
//!
//! ```rust
//! use dashboard_ingest::decoder::{decode_row, split_fields};
//! use dashboard_ingest::models::{DatasetKind, Value};
//!
//! let headers = split_fields("productName,count,unitValue,isRefunded");
//! let fields = split_fields("\"Beer, draft\",2,12.5,TRUE");
//! let record = decode_row(DatasetKind::Bar, &headers, &fields);
//!
//! assert_eq!(record["productName"], Value::Text("Beer, draft".into()));
//! assert_eq!(record["count"], Value::Int(2));
//! assert_eq!(record["isRefunded"], Value::Bool(true));
//! ```

pub mod field_parsers;
pub mod record_decoder;
pub mod rules;

#[cfg(test)]
pub(crate) mod tests;

pub use field_parsers::coerce;
pub use record_decoder::{decode_record, decode_row, normalize_header, split_fields};
pub use rules::{FieldKind, FieldRules};
