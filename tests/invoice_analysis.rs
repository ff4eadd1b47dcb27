//! End to end: a JOIN query result goes in, analysis helpers run on the record.

use invoice_normalizer_lib::{format_amount, normalize, ExtractorKind, QueryPathHint, RawNode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn description(i: usize) -> String {
    match i {
        3 => "Sales tax adjustment".to_string(),
        12 => "Tax filing fee".to_string(),
        26 => "Property TAX escrow".to_string(),
        _ => format!("Hardware item {}", i),
    }
}

fn amount(i: usize) -> String {
    match i {
        4 => "$85.44".to_string(),
        17 => "$112.34".to_string(),
        _ => format!("${}.{:02}", 5 + i, (i * 7) % 100),
    }
}

fn thirty_item_join_result() -> RawNode {
    let tokens: Vec<Value> = (0..30)
        .map(|i| {
            json!({
                "li": {
                    "description": description(i),
                    "amount": amount(i),
                    "taxCategory": if i % 2 == 0 { "IVA16" } else { "" }
                }
            })
        })
        .collect();
    let wrappers: Vec<Value> = tokens.chunks(10).map(|c| json!({ "children": c })).collect();
    RawNode::new(json!([{
        "id": "inv-30",
        "vendorName": "Distribuidora del Norte",
        "invoiceNumber": "A-3030",
        "invoiceDate": "2024-05-17T10:30:00Z",
        "total": "$1,590 MXN",
        "lineItemCount": 30,
        "lineItems": wrappers
    }]))
}

#[test]
fn thirty_item_join_result_supports_analysis() {
    let record = normalize(&thirty_item_join_result(), QueryPathHint::Projected).unwrap();

    assert_eq!(record.extracted_by, ExtractorKind::Projected);
    assert_eq!(record.line_items.len(), 30);
    assert_eq!(record.currency, "MXN");
    assert_eq!(record.total, dec("1590"));
    assert_eq!(record.issue_date.map(|d| d.to_string()).as_deref(), Some("2024-05-17"));

    let tax = record.items_matching("tax");
    assert_eq!(tax.len(), 3);
    assert_eq!(tax[2].description, "Property TAX escrow");

    let above: Vec<Decimal> = record.items_above(dec("50")).iter().map(|i| i.amount).collect();
    assert_eq!(above, vec![dec("85.44"), dec("112.34")]);

    assert_eq!(record.line_items[0].tax_category.as_deref(), Some("IVA16"));
    assert_eq!(record.line_items[1].tax_category, None);

    let pairs = record.description_amount_pairs();
    assert_eq!(pairs[4], ("Hardware item 4", dec("85.44")));
}

#[test]
fn record_serializes_camel_case_and_reads_back() {
    let record = normalize(&thirty_item_join_result(), QueryPathHint::Projected).unwrap();
    let text = serde_json::to_string(&record).unwrap();
    assert!(text.contains("\"vendorName\":\"Distribuidora del Norte\""));
    assert!(text.contains("\"extractedBy\":\"projected\""));
    assert!(!text.contains("\"attempts\""));

    let back: invoice_normalizer_lib::InvoiceRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(back, record);
}

#[test]
fn summary_uses_grouped_amounts() {
    let record = normalize(&thirty_item_join_result(), QueryPathHint::Projected).unwrap();
    let summary = record.summary();
    assert!(summary.starts_with("Distribuidora del Norte | A-3030 | 2024-05-17 | 1,590.00 MXN | 30 items"));
    assert_eq!(format_amount(dec("27826.17")), "27,826.17");
}
