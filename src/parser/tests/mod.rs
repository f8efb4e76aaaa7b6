//! Tests for the background parser
//!
//! - [`job_tests`] - batch loop, progress and failure semantics
//! - [`worker_tests`] - threading, message ordering and cancellation

pub mod worker_tests;

/// `count,total` payload with `rows` data lines
pub fn numbered_payload(rows: usize) -> String {
    let mut payload = String::from("id,count,total\n");
    for i in 0..rows {
        payload.push_str(&format!("{},{},{}.5\n", i, i % 7, i));
    }
    payload
}
