//! Coercion default law: empty or malformed input always yields the
//! documented default for the field's rule.

use crate::decoder::field_parsers::{coerce, parse_flag, parse_float, parse_integer, parse_text};
use crate::decoder::rules::{FieldKind, FieldRules};
use crate::models::{DatasetKind, Value};

#[test]
fn test_integer_defaults_to_zero() {
    for raw in ["", "   ", "abc", "NaN", "1e999", "--3"] {
        assert_eq!(parse_integer(raw), 0, "input {:?}", raw);
    }
    assert_eq!(parse_integer(" 42 "), 42);
    assert_eq!(parse_integer("-7"), -7);
    assert_eq!(parse_integer("3.0"), 3);
    assert_eq!(parse_integer("2.9"), 2);
}

#[test]
fn test_float_defaults_to_zero() {
    for raw in ["", "R$ 10", "n/a", "NaN", "inf"] {
        assert_eq!(parse_float(raw), 0.0, "input {:?}", raw);
    }
    assert_eq!(parse_float("9.90"), 9.9);
    assert_eq!(parse_float(" -1.5 "), -1.5);
    assert_eq!(parse_float("1200"), 1200.0);
}

#[test]
fn test_flag_accepts_only_true_literal() {
    assert!(parse_flag("true"));
    assert!(parse_flag("TRUE"));
    assert!(parse_flag("  True "));
    assert!(!parse_flag("no"));
    assert!(!parse_flag("1"));
    assert!(!parse_flag("yes"));
    assert!(!parse_flag(""));
    assert!(!parse_flag("truest"));
}

#[test]
fn test_text_is_trimmed_or_null() {
    assert_eq!(parse_text("  Cerveja "), Value::Text("Cerveja".to_string()));
    assert_eq!(parse_text(""), Value::Null);
    assert_eq!(parse_text("   "), Value::Null);
}

#[test]
fn test_coerce_never_yields_wrong_type() {
    let inputs = ["", "x", "12", "1.5", "true", "\u{0}"];
    for raw in inputs {
        assert!(matches!(coerce(raw, FieldKind::Integer), Value::Int(_)));
        assert!(matches!(coerce(raw, FieldKind::Float), Value::Float(_)));
        assert!(matches!(coerce(raw, FieldKind::Boolean), Value::Bool(_)));
        assert!(matches!(
            coerce(raw, FieldKind::Text),
            Value::Text(_) | Value::Null
        ));
    }
}

#[test]
fn test_dataset_rule_tables() {
    let bar = FieldRules::for_kind(DatasetKind::Bar);
    assert_eq!(bar.kind_of("count"), FieldKind::Integer);
    assert_eq!(bar.kind_of("unitValue"), FieldKind::Float);
    assert_eq!(bar.kind_of("discountValue"), FieldKind::Float);
    assert_eq!(bar.kind_of("isRefunded"), FieldKind::Boolean);
    assert_eq!(bar.kind_of("productName"), FieldKind::Text);

    let tickets = FieldRules::for_kind(DatasetKind::TicketSales);
    assert_eq!(tickets.kind_of("quantidade"), FieldKind::Integer);
    assert_eq!(tickets.kind_of("valor_liquido"), FieldKind::Float);
    assert_eq!(tickets.kind_of("ticketeira"), FieldKind::Text);
    assert_eq!(tickets.kind_of("count"), FieldKind::Text);
}
