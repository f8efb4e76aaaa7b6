//! Worker threading and message ordering

use super::numbered_payload;
use crate::decoder::tests::fixture_rules;
use crate::error::IngestError;
use crate::models::{DatasetKind, RawPayload};
use crate::parser::events::ParserMessage;
use crate::parser::worker::BackgroundParser;

#[tokio::test]
async fn test_worker_emits_progress_then_single_result() {
    let parser = BackgroundParser::new(100);
    let payload = RawPayload::new(DatasetKind::Bar, numbered_payload(450));
    let mut handle = parser.spawn(payload, fixture_rules(), 7).unwrap();

    let mut percents = Vec::new();
    let mut results = 0;
    let mut final_count = None;
    while let Some(event) = handle.next_event().await {
        assert_eq!(event.token, 7);
        assert_eq!(event.kind, DatasetKind::Bar);
        assert_eq!(results, 0, "no event may follow the result");
        match event.message {
            ParserMessage::Progress(progress) => percents.push(progress.percent),
            ParserMessage::Completed { records, count } => {
                assert_eq!(records.len(), count);
                final_count = Some(count);
                results += 1;
            }
            ParserMessage::Failed { message } => panic!("unexpected failure: {}", message),
        }
    }

    assert_eq!(results, 1);
    assert_eq!(final_count, Some(450));
    assert_eq!(percents.len(), 5);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_worker_reports_failure_once() {
    let parser = BackgroundParser::new(100);
    let mut handle = parser
        .spawn(RawPayload::new(DatasetKind::TicketSales, ""), fixture_rules(), 1)
        .unwrap();

    let event = handle.next_event().await.expect("failure event");
    assert!(matches!(event.message, ParserMessage::Failed { .. }));
    assert!(handle.next_event().await.is_none());
}

#[tokio::test]
async fn test_wait_returns_records_or_parse_failure() {
    let parser = BackgroundParser::new(1000);
    let records = parser
        .spawn(
            RawPayload::new(DatasetKind::Bar, numbered_payload(20)),
            fixture_rules(),
            1,
        )
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(records.len(), 20);

    let err = parser
        .spawn(RawPayload::new(DatasetKind::Bar, "\n"), fixture_rules(), 2)
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::ParseFailure { .. }));
}

#[tokio::test]
async fn test_cancelled_worker_never_completes() {
    let parser = BackgroundParser::new(1);
    let mut handle = parser
        .spawn(
            RawPayload::new(DatasetKind::Bar, numbered_payload(200_000)),
            fixture_rules(),
            3,
        )
        .unwrap();
    handle.cancel();

    while let Some(event) = handle.next_event().await {
        assert!(
            !matches!(event.message, ParserMessage::Completed { .. }),
            "a cancelled worker must not deliver a result"
        );
    }
    assert!(handle.worker_finished() || handle.next_event().await.is_none());
}
