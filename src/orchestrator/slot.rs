//! Per-dataset bookkeeping: observable state, cycle serialization,
//! invalidation generations and parse tokens.

use crate::config::ProgressSplit;
use crate::models::{DatasetKind, DatasetState, Record};
use crate::parser::{ParseToken, ParserEvent, ParserMessage};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

/// What a parser event means for the current cycle
#[derive(Debug)]
pub enum EventOutcome {
    /// Stale token or foreign dataset
    Ignored,
    /// Overall progress, already remapped into the parse range
    Progress(f64),
    Completed(Vec<Record>),
    Failed(String),
}

#[derive(Debug)]
pub(crate) struct DatasetSlot {
    kind: DatasetKind,
    state: watch::Sender<DatasetState>,
    /// Bumped by cancel / clear; a cycle only publishes while it matches
    generation: watch::Sender<u64>,
    /// Token of the parse whose events are accepted, 0 when none
    active_token: AtomicU64,
    parse_cancel: Mutex<Option<Arc<AtomicBool>>>,
    /// Server marker matching the records currently held in `state`
    served_marker: Mutex<Option<String>>,
    /// Held for the whole of one Deciding..Ready cycle
    pub(crate) cycle: tokio::sync::Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DatasetSlot {
    pub fn new(kind: DatasetKind) -> Self {
        Self {
            kind,
            state: watch::Sender::new(DatasetState::idle(kind)),
            generation: watch::Sender::new(0),
            active_token: AtomicU64::new(0),
            parse_cancel: Mutex::new(None),
            served_marker: Mutex::new(None),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn snapshot(&self) -> DatasetState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DatasetState> {
        self.state.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub fn watch_generation(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Apply `f` unless `generation` has been invalidated; returns whether it ran
    pub fn update<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut DatasetState),
    {
        self.state.send_if_modified(|state| {
            if *self.generation.borrow() != generation {
                return false;
            }
            f(state);
            true
        })
    }

    /// Raise overall progress; never lowers it
    pub fn advance(&self, generation: u64, percent: f64) -> bool {
        self.update(generation, |state| {
            if percent > state.progress_percent {
                state.progress_percent = percent;
            }
        })
    }

    /// Invalidate the running cycle (if any) and reset state with `reset`
    pub fn invalidate<F>(&self, reset: F)
    where
        F: FnOnce(&mut DatasetState),
    {
        self.state.send_modify(|state| {
            self.generation.send_modify(|generation| *generation += 1);
            self.active_token.store(0, Ordering::SeqCst);
            if let Some(flag) = lock(&self.parse_cancel).take() {
                flag.store(true, Ordering::Relaxed);
            }
            reset(state);
        });
    }

    pub fn begin_parse(&self, token: ParseToken, cancel: Arc<AtomicBool>) {
        self.active_token.store(token, Ordering::SeqCst);
        *lock(&self.parse_cancel) = Some(cancel);
    }

    pub fn end_parse(&self, token: ParseToken) {
        let _ = self
            .active_token
            .compare_exchange(token, 0, Ordering::SeqCst, Ordering::SeqCst);
        lock(&self.parse_cancel).take();
    }

    pub fn served_marker(&self) -> Option<String> {
        lock(&self.served_marker).clone()
    }

    pub fn set_served_marker(&self, marker: Option<String>) {
        *lock(&self.served_marker) = marker;
    }

    /// Accept only events from the active parse of this dataset
    pub fn handle_event(&self, event: ParserEvent, split: &ProgressSplit) -> EventOutcome {
        let active = self.active_token.load(Ordering::SeqCst);
        if active == 0 || event.token != active || event.kind != self.kind {
            debug!(
                "{}: dropping event from token {} (active {})",
                self.kind, event.token, active
            );
            return EventOutcome::Ignored;
        }

        match event.message {
            ParserMessage::Progress(progress) => {
                EventOutcome::Progress(split.parse_progress(progress.percent))
            }
            ParserMessage::Completed { records, .. } => EventOutcome::Completed(records),
            ParserMessage::Failed { message } => EventOutcome::Failed(message),
        }
    }
}
