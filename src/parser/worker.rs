//! Dedicated parse threads and their event channels

use super::events::{ParseToken, ParserEvent, ParserMessage};
use super::job::{JobOutcome, ParseJob};
use crate::decoder::FieldRules;
use crate::error::{IngestError, Result};
use crate::models::{DatasetKind, RawPayload, Record};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Spawns one worker thread per parse
#[derive(Debug, Clone)]
pub struct BackgroundParser {
    batch_size: usize,
}

impl BackgroundParser {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Move `payload` onto a new worker thread and start decoding
    pub fn spawn(
        &self,
        payload: RawPayload,
        rules: FieldRules,
        token: ParseToken,
    ) -> Result<ParseHandle> {
        let kind = payload.kind;
        let job = ParseJob::new(kind, rules, self.batch_size);
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let thread = std::thread::Builder::new()
            .name(format!("parse-{}", kind))
            .spawn(move || run_worker(job, payload, token, tx, worker_cancel))
            .map_err(|e| IngestError::WorkerUnavailable {
                kind,
                reason: e.to_string(),
            })?;

        debug!("Spawned parse worker for {} (token {})", kind, token);
        Ok(ParseHandle {
            token,
            kind,
            events: rx,
            cancel,
            thread: Some(thread),
        })
    }
}

fn run_worker(
    job: ParseJob,
    payload: RawPayload,
    token: ParseToken,
    tx: mpsc::UnboundedSender<ParserEvent>,
    cancel: Arc<AtomicBool>,
) {
    let kind = job.kind();
    let emit = |message: ParserMessage| tx.send(ParserEvent {
        token,
        kind,
        message,
    });

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        job.run(&payload.text, &cancel, |progress| {
            if emit(ParserMessage::Progress(progress)).is_err() {
                // Receiver gone: the handle was discarded
                cancel.store(true, Ordering::Relaxed);
            }
        })
    }))
    .unwrap_or_else(|_| JobOutcome::Failed(format!("{} parser panicked", kind)));
    drop(payload);

    match outcome {
        JobOutcome::Completed(records) => {
            let count = records.len();
            info!("Parsed {} {} records", count, kind);
            let _ = emit(ParserMessage::Completed { records, count });
        }
        JobOutcome::Failed(message) => {
            warn!("Parse of {} failed: {}", kind, message);
            let _ = emit(ParserMessage::Failed { message });
        }
        JobOutcome::Cancelled => {
            debug!("Parse worker for {} cancelled (token {})", kind, token);
        }
    }
}

/// Caller's side of one in-flight parse
///
/// Dropping the handle discards the worker: it stops at its next batch
/// boundary and nothing it sends afterwards is observed.
#[derive(Debug)]
pub struct ParseHandle {
    token: ParseToken,
    kind: DatasetKind,
    events: mpsc::UnboundedReceiver<ParserEvent>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ParseHandle {
    pub fn token(&self) -> ParseToken {
        self.token
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Next event, or `None` once the worker has exited
    pub async fn next_event(&mut self) -> Option<ParserEvent> {
        self.events.recv().await
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn worker_finished(&self) -> bool {
        self.thread
            .as_ref()
            .is_none_or(|thread| thread.is_finished())
    }

    /// Drain events, ignoring progress, and return the final records
    pub async fn wait(mut self) -> Result<Vec<Record>> {
        let kind = self.kind;
        while let Some(event) = self.next_event().await {
            match event.message {
                ParserMessage::Progress(_) => continue,
                ParserMessage::Completed { records, .. } => return Ok(records),
                ParserMessage::Failed { message } => {
                    return Err(IngestError::parse_failure(kind, message));
                }
            }
        }
        Err(IngestError::parse_failure(
            kind,
            "worker exited without a result",
        ))
    }
}

impl Drop for ParseHandle {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        // Detach: the thread notices the flag or the closed channel on its own
        drop(self.thread.take());
    }
}
