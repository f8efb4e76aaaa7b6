//! Conversion between record collections and columnar frames
//!
//! Column types are inferred from the values themselves: a column whose
//! non-null values share one scalar type keeps it, integers mixed with
//! floats widen to float, and any other mix is stored as text.

use crate::error::Result;
use crate::models::{Record, Value};
use polars::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
}

fn value_type(value: &Value) -> Option<ColumnType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(ColumnType::Bool),
        Value::Int(_) => Some(ColumnType::Int),
        Value::Float(_) => Some(ColumnType::Float),
        Value::Text(_) => Some(ColumnType::Text),
    }
}

fn infer_column_type(records: &[Record], name: &str) -> ColumnType {
    let mut inferred = None;
    for value in records.iter().filter_map(|record| record.get(name)) {
        let Some(current) = value_type(value) else {
            continue;
        };
        inferred = match (inferred, current) {
            (None, t) => Some(t),
            (Some(a), b) if a == b => Some(a),
            (Some(ColumnType::Int), ColumnType::Float)
            | (Some(ColumnType::Float), ColumnType::Int) => Some(ColumnType::Float),
            _ => return ColumnType::Text,
        };
    }
    inferred.unwrap_or(ColumnType::Text)
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Build a frame holding every field that appears in `records`
pub fn records_to_frame(records: &[Record]) -> Result<DataFrame> {
    let names: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let cells = records.iter().map(|record| record.get(name));
        let column = match infer_column_type(records, name) {
            ColumnType::Int => {
                let values: Vec<Option<i64>> =
                    cells.map(|cell| cell.and_then(Value::as_i64)).collect();
                Column::new(name.into(), values)
            }
            ColumnType::Float => {
                let values: Vec<Option<f64>> =
                    cells.map(|cell| cell.and_then(Value::as_f64)).collect();
                Column::new(name.into(), values)
            }
            ColumnType::Bool => {
                let values: Vec<Option<bool>> =
                    cells.map(|cell| cell.and_then(Value::as_bool)).collect();
                Column::new(name.into(), values)
            }
            ColumnType::Text => {
                let values: Vec<Option<String>> =
                    cells.map(|cell| cell.and_then(text_of)).collect();
                Column::new(name.into(), values)
            }
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}

/// Rebuild one record per frame row; nulls come back as `Value::Null`
pub fn frame_to_records(frame: &DataFrame) -> Result<Vec<Record>> {
    let mut records: Vec<Record> = (0..frame.height()).map(|_| Record::new()).collect();

    for column in frame.get_columns() {
        let name = column.name().to_string();
        let series = column.as_materialized_series();

        match series.dtype() {
            DataType::Int64 => {
                for (record, cell) in records.iter_mut().zip(series.i64()?.into_iter()) {
                    record.insert(name.clone(), cell.map_or(Value::Null, Value::Int));
                }
            }
            DataType::Float64 => {
                for (record, cell) in records.iter_mut().zip(series.f64()?.into_iter()) {
                    record.insert(name.clone(), cell.map_or(Value::Null, Value::Float));
                }
            }
            DataType::Boolean => {
                for (record, cell) in records.iter_mut().zip(series.bool()?.into_iter()) {
                    record.insert(name.clone(), cell.map_or(Value::Null, Value::Bool));
                }
            }
            DataType::String => {
                for (record, cell) in records.iter_mut().zip(series.str()?.into_iter()) {
                    let value = cell.map_or(Value::Null, |text| Value::Text(text.to_string()));
                    record.insert(name.clone(), value);
                }
            }
            _ => {
                let text = series.cast(&DataType::String)?;
                for (record, cell) in records.iter_mut().zip(text.str()?.into_iter()) {
                    let value = cell.map_or(Value::Null, |text| Value::Text(text.to_string()));
                    record.insert(name.clone(), value);
                }
            }
        }
    }

    Ok(records)
}
