//! Row assembly and quoting behaviour

use super::fixture_rules;
use crate::decoder::record_decoder::{decode_record, decode_row, normalize_header, split_fields};
use crate::models::{DatasetKind, Value};

#[test]
fn test_quoted_field_keeps_embedded_delimiter() {
    let fields = split_fields("\"a,b\",5,10");
    assert_eq!(fields, vec!["a,b", "5", "10"]);
}

#[test]
fn test_split_plain_and_empty_fields() {
    assert_eq!(split_fields("1,3,9.90"), vec!["1", "3", "9.90"]);
    assert_eq!(split_fields("2,,"), vec!["2", "", ""]);
}

#[test]
fn test_fixture_rows_decode_with_defaults() {
    let headers = split_fields("id,count,total");
    let rules = fixture_rules();

    let first = decode_record(&headers, &split_fields("1,3,9.90"), &rules);
    assert_eq!(first["id"], Value::Text("1".to_string()));
    assert_eq!(first["count"], Value::Int(3));
    assert_eq!(first["total"], Value::Float(9.9));

    let second = decode_record(&headers, &split_fields("2,,"), &rules);
    assert_eq!(second["id"], Value::Text("2".to_string()));
    assert_eq!(second["count"], Value::Int(0));
    assert_eq!(second["total"], Value::Float(0.0));
}

#[test]
fn test_short_rows_fill_defaults_and_long_rows_truncate() {
    let headers = ["id", "count", "total"];
    let rules = fixture_rules();

    let short = decode_record(&headers, &["7"], &rules);
    assert_eq!(short.len(), 3);
    assert_eq!(short["count"], Value::Int(0));
    assert_eq!(short["total"], Value::Float(0.0));

    let long = decode_record(&headers, &["7", "1", "2.5", "surplus"], &rules);
    assert_eq!(long.len(), 3);
    assert_eq!(long["total"], Value::Float(2.5));
}

#[test]
fn test_bar_row_decoding() {
    let headers = split_fields(
        "transactionId,productName,productCategory,count,unitValue,discountValue,isRefunded",
    );
    let fields = split_fields("tx-1,\"Gin, tonica\",Drinks,2,3500,,FALSE");
    let record = decode_row(DatasetKind::Bar, &headers, &fields);

    assert_eq!(record["transactionId"], Value::Text("tx-1".to_string()));
    assert_eq!(record["productName"], Value::Text("Gin, tonica".to_string()));
    assert_eq!(record["count"], Value::Int(2));
    assert_eq!(record["unitValue"], Value::Float(3500.0));
    assert_eq!(record["discountValue"], Value::Float(0.0));
    assert_eq!(record["isRefunded"], Value::Bool(false));
}

#[test]
fn test_ticket_sales_row_decoding() {
    let headers = split_fields("evento,ticketeira,quantidade,valor_liquido,tipo");
    let fields = split_fields("Festival,,4,480.00,  ");
    let record = decode_row(DatasetKind::TicketSales, &headers, &fields);

    assert_eq!(record["evento"], Value::Text("Festival".to_string()));
    assert_eq!(record["ticketeira"], Value::Null);
    assert_eq!(record["quantidade"], Value::Int(4));
    assert_eq!(record["valor_liquido"], Value::Float(480.0));
    assert_eq!(record["tipo"], Value::Null);
}

#[test]
fn test_header_normalization_strips_bom() {
    assert_eq!(normalize_header("\u{feff}transactionId"), "transactionId");
    assert_eq!(normalize_header("  count "), "count");
}
