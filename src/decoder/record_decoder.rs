//! Row assembly for decoded records

use super::field_parsers::coerce;
use super::rules::FieldRules;
use crate::models::{DatasetKind, Record};

/// Split one line on commas, honouring double-quoted fields
///
/// Delimiters inside quotes do not split the field and the quotes are not
/// part of the returned value.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(str::to_string).collect(),
        // Unterminated quotes and the like: fall back to a plain split
        Ok(false) | Err(_) => line.split(',').map(|f| f.replace('"', "")).collect(),
    }
}

/// Header name as used for record keys: trimmed, without a byte-order mark
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// Decode one row against explicit coercion rules
///
/// Missing trailing fields decode as if empty; surplus fields are ignored.
pub fn decode_record<H, F>(headers: &[H], fields: &[F], rules: &FieldRules) -> Record
where
    H: AsRef<str>,
    F: AsRef<str>,
{
    headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let name = header.as_ref();
            let raw = fields.get(index).map(|field| field.as_ref()).unwrap_or("");
            (name.to_string(), coerce(raw, rules.kind_of(name)))
        })
        .collect()
}

/// Decode one row using the coercion table of `kind`
pub fn decode_row<H, F>(kind: DatasetKind, headers: &[H], fields: &[F]) -> Record
where
    H: AsRef<str>,
    F: AsRef<str>,
{
    decode_record(headers, fields, &FieldRules::for_kind(kind))
}
