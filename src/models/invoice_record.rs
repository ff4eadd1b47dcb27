use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AttemptFailure;
use crate::types::{CoercionFailure, ExtractorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_category: Option<String>,
}

/// Canonical invoice, identical no matter which query path produced it.
///
/// `total` is the header value as stored; it is never recomputed from the
/// line items (see [`InvoiceRecord::line_item_total`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub vendor_name: String,
    pub invoice_number: String,
    pub currency: String,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub line_items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count_hint: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coercion_failures: Vec<CoercionFailure>,
    pub extracted_by: ExtractorKind,
    /// Extractors that ran and were rejected before `extracted_by` succeeded.
    #[serde(default, skip_deserializing, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptFailure>,
}

impl InvoiceRecord {
    pub fn line_item_total(&self) -> Decimal {
        self.line_items.iter().map(|i| i.amount).sum()
    }

    /// Items whose description contains `needle`, case-insensitive.
    pub fn items_matching(&self, needle: &str) -> Vec<&LineItem> {
        let needle = needle.to_lowercase();
        self.line_items
            .iter()
            .filter(|i| i.description.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn items_above(&self, amount: Decimal) -> Vec<&LineItem> {
        self.line_items.iter().filter(|i| i.amount > amount).collect()
    }

    pub fn description_amount_pairs(&self) -> Vec<(&str, Decimal)> {
        self.line_items
            .iter()
            .map(|i| (i.description.as_str(), i.amount))
            .collect()
    }

    /// One line for logs and the dump binary, e.g. `ACME | F-001 | 2024-03-01 | 1,590.00 MXN | 3 items`.
    pub fn summary(&self) -> String {
        let date = self
            .issue_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} | {} | {} | {} {} | {} items (sum {})",
            if self.vendor_name.is_empty() { "-" } else { &self.vendor_name },
            if self.invoice_number.is_empty() { "-" } else { &self.invoice_number },
            date,
            format_amount(self.total),
            self.currency,
            self.line_items.len(),
            format_amount(self.line_item_total()),
        )
    }
}

/// Format amount with thousands separator and two decimals (e.g. 27826.17 -> "27,826.17").
pub fn format_amount(n: Decimal) -> String {
    let s = format!("{:.2}", n.round_dp(2));
    let (int_part, dec_part) = match s.find('.') {
        Some(dot) => (&s[..dot], &s[dot..]),
        None => (s.as_str(), ""),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut out = String::from(sign);
    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.push_str(dec_part);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(description: &str, amount: &str) -> LineItem {
        LineItem {
            description: description.to_string(),
            amount: d(amount),
            quantity: None,
            unit_price: None,
            tax_category: None,
        }
    }

    fn record(items: Vec<LineItem>) -> InvoiceRecord {
        InvoiceRecord {
            vendor_name: "ACME".to_string(),
            invoice_number: "F-001".to_string(),
            currency: "MXN".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            due_date: None,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: d("197.78"),
            line_items: items,
            item_count_hint: None,
            coercion_failures: vec![],
            extracted_by: ExtractorKind::Document,
            attempts: vec![],
        }
    }

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(d("27826.17")), "27,826.17");
        assert_eq!(format_amount(d("1590")), "1,590.00");
        assert_eq!(format_amount(d("-1234567.5")), "-1,234,567.50");
        assert_eq!(format_amount(d("85.44")), "85.44");
    }

    #[test]
    fn helpers_filter_without_touching_total() {
        let r = record(vec![
            item("Widget", "85.44"),
            item("Sales TAX", "12.22"),
            item("Gadget", "92.34"),
        ]);
        assert_eq!(r.items_matching("tax").len(), 1);
        assert_eq!(r.items_above(d("50")).len(), 2);
        assert_eq!(r.line_item_total(), d("190.00"));
        assert_eq!(r.total, d("197.78"));
    }

    #[test]
    fn summary_mentions_both_totals() {
        let r = record(vec![item("Widget", "190")]);
        let line = r.summary();
        assert!(line.contains("197.78 MXN"), "{}", line);
        assert!(line.contains("sum 190.00"), "{}", line);
    }
}
