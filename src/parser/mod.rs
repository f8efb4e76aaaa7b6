//! Background parser for downloaded export payloads
//!
//! Decodes an entire payload on a dedicated worker thread so multi-million
//! row exports never block the caller. Everything crosses the thread
//! boundary by message: the payload moves in, tagged progress / result /
//! error events come out over a channel.
//!
//! ## Architecture
//!
//! - [`job`] - synchronous batch loop over one payload
//! - [`worker`] - thread spawning, cancellation and the event channel
//! - [`events`] - messages emitted by a worker
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dashboard_ingest::decoder::FieldRules;
//! use dashboard_ingest::models::{DatasetKind, RawPayload};
//! use dashboard_ingest::parser::{BackgroundParser, ParserMessage};
//!
//! # async fn example() -> dashboard_ingest::Result<()> {
//! let payload = RawPayload::new(DatasetKind::Bar, "count\n1\n2\n");
//! let parser = BackgroundParser::new(1000);
//! let mut handle = parser.spawn(payload, FieldRules::for_kind(DatasetKind::Bar), 1)?;
//!
//! while let Some(event) = handle.next_event().await {
//!     match event.message {
//!         ParserMessage::Progress(progress) => println!("{:.0}%", progress.percent),
//!         ParserMessage::Completed { count, .. } => println!("{} records", count),
//!         ParserMessage::Failed { message } => eprintln!("{}", message),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod job;
pub mod worker;

#[cfg(test)]
mod tests;

pub use events::{ParseProgress, ParseToken, ParserEvent, ParserMessage};
pub use job::{JobOutcome, ParseJob};
pub use worker::{BackgroundParser, ParseHandle};
