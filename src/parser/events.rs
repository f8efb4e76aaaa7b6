//! Messages emitted by a parse worker

use crate::models::{DatasetKind, Record};

/// Identifies one parse invocation; events carrying another token are stale
pub type ParseToken = u64;

/// Progress after one batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseProgress {
    pub rows_processed: usize,
    /// Estimate: non-blank lines minus the header
    pub total_rows: usize,
    pub percent: f64,
}

impl ParseProgress {
    pub fn new(rows_processed: usize, total_rows: usize) -> Self {
        let percent = if total_rows == 0 {
            100.0
        } else {
            (rows_processed as f64 / total_rows as f64 * 100.0).min(100.0)
        };
        Self {
            rows_processed,
            total_rows,
            percent,
        }
    }
}

#[derive(Debug)]
pub enum ParserMessage {
    Progress(ParseProgress),
    /// Exactly one per successful parse, always the last message
    Completed { records: Vec<Record>, count: usize },
    /// Exactly one per failed parse; no partial result accompanies it
    Failed { message: String },
}

#[derive(Debug)]
pub struct ParserEvent {
    pub token: ParseToken,
    pub kind: DatasetKind,
    pub message: ParserMessage,
}
