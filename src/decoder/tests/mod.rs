//! Tests for the record decoder
//!
//! Organized by concern:
//! - [`field_parser_tests`] - per-field coercion defaults
//! - [`record_decoder_tests`] - quoting and row assembly

pub mod field_parser_tests;
pub mod record_decoder_tests;

use super::rules::{FieldKind, FieldRules};

/// Rules for the small `id,count,total` fixture used across tests
pub fn fixture_rules() -> FieldRules {
    FieldRules::new([("count", FieldKind::Integer), ("total", FieldKind::Float)])
}
