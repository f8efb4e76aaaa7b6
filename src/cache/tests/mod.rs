//! Tests for the persistent cache store
//!
//! - [`frame_tests`] - record collection to frame conversion
//! - [`store_tests`] - partitioned read / write / clear semantics

pub mod store_tests;

use crate::models::{Record, Value};

/// Bar-shaped record with every field kind represented
pub fn bar_record(id: i64, refunded: bool) -> Record {
    let mut record = Record::new();
    record.insert("count".to_string(), Value::Int(id % 5));
    record.insert("unitValue".to_string(), Value::Float(id as f64 * 1.25));
    record.insert("isRefunded".to_string(), Value::Bool(refunded));
    record.insert("productName".to_string(), Value::Text(format!("item-{}", id)));
    record.insert("notes".to_string(), Value::Null);
    record
}

pub fn bar_records(n: usize) -> Vec<Record> {
    (0..n as i64).map(|i| bar_record(i, i % 3 == 0)).collect()
}
