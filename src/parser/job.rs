//! Synchronous batch loop over one payload

use super::events::ParseProgress;
use crate::decoder::{FieldRules, decode_record, normalize_header, split_fields};
use crate::models::{DatasetKind, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Result of running a job to completion
#[derive(Debug)]
pub enum JobOutcome {
    Completed(Vec<Record>),
    Cancelled,
    Failed(String),
}

/// One parse of one payload
#[derive(Debug, Clone)]
pub struct ParseJob {
    kind: DatasetKind,
    rules: FieldRules,
    batch_size: usize,
}

impl ParseJob {
    pub fn new(kind: DatasetKind, rules: FieldRules, batch_size: usize) -> Self {
        Self {
            kind,
            rules,
            batch_size: batch_size.max(1),
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Estimated data rows: non-blank lines minus the header
    pub fn estimate_rows(payload: &str) -> usize {
        payload
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count()
            .saturating_sub(1)
    }

    /// Decode `payload`, calling `on_progress` after every batch
    ///
    /// The cancel flag is checked between batches.
    pub fn run<F>(&self, payload: &str, cancel: &AtomicBool, mut on_progress: F) -> JobOutcome
    where
        F: FnMut(ParseProgress),
    {
        let total_rows = Self::estimate_rows(payload);
        let mut lines = payload.lines().filter(|line| !line.trim().is_empty());

        let headers: Vec<String> = match lines.next() {
            Some(line) => split_fields(line)
                .iter()
                .map(|header| normalize_header(header))
                .collect(),
            None => return JobOutcome::Failed(format!("{} payload is empty", self.kind)),
        };
        if headers.iter().all(|header| header.is_empty()) {
            return JobOutcome::Failed("header row has no column names".to_string());
        }
        debug!(
            "Parsing {} payload: {} columns, ~{} rows",
            self.kind,
            headers.len(),
            total_rows
        );

        let mut records = Vec::with_capacity(total_rows);
        let mut in_batch = 0;

        // One record per non-blank line; a malformed line only affects itself
        for line in lines {
            let fields = split_fields(line);
            records.push(decode_record(&headers, &fields, &self.rules));
            in_batch += 1;

            if in_batch == self.batch_size {
                in_batch = 0;
                if cancel.load(Ordering::Relaxed) {
                    return JobOutcome::Cancelled;
                }
                on_progress(ParseProgress::new(records.len(), total_rows));
            }
        }

        if cancel.load(Ordering::Relaxed) {
            return JobOutcome::Cancelled;
        }
        if in_batch > 0 {
            on_progress(ParseProgress::new(records.len(), total_rows));
        }

        JobOutcome::Completed(records)
    }
}
