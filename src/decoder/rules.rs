//! Per-dataset coercion tables
//!
//! Each dataset kind names the fields that need numeric or boolean
//! coercion; every other column decodes as trimmed text.

use crate::models::DatasetKind;
use std::collections::HashMap;

/// Coercion applied to one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer, default 0
    Integer,
    /// Floating point, default 0.0
    Float,
    /// True only for the literal "true" (trimmed, case-insensitive)
    Boolean,
    /// Trimmed string, null when empty
    Text,
}

const BAR_FIELDS: &[(&str, FieldKind)] = &[
    ("count", FieldKind::Integer),
    ("unitValue", FieldKind::Float),
    ("discountValue", FieldKind::Float),
    ("isRefunded", FieldKind::Boolean),
];

const TICKET_SALES_FIELDS: &[(&str, FieldKind)] = &[
    ("quantidade", FieldKind::Integer),
    ("valor_liquido", FieldKind::Float),
    ("valor_bruto", FieldKind::Float),
    ("valor_desconto", FieldKind::Float),
];

/// Coercion table for one dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRules {
    rules: HashMap<String, FieldKind>,
}

impl FieldRules {
    pub fn new<'a>(rules: impl IntoIterator<Item = (&'a str, FieldKind)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(name, kind)| (name.to_string(), kind))
                .collect(),
        }
    }

    pub fn for_kind(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Bar => Self::new(BAR_FIELDS.iter().copied()),
            DatasetKind::TicketSales => Self::new(TICKET_SALES_FIELDS.iter().copied()),
        }
    }

    /// Coercion for `field`; columns without a rule are text
    pub fn kind_of(&self, field: &str) -> FieldKind {
        self.rules.get(field).copied().unwrap_or(FieldKind::Text)
    }
}
