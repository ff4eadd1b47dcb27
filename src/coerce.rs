//! Scalar coercion: loosely-typed store values into decimals, dates and strings.
//!
//! Every function here is total. Unparseable input yields the type's default
//! with [`CoercionStatus::Failed`]; absent input yields the default with
//! [`CoercionStatus::Missing`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::config::NumberFormat;
use crate::types::{Coerced, CoercionStatus};

/// Literal-node properties holding a numeric value, in preference order.
const DECIMAL_LITERAL_KEYS: &[&str] = &[
    "valueCurrency",
    "valueNumber",
    "amount",
    "value",
    "valueString",
    "content",
    "text",
];
const DATE_LITERAL_KEYS: &[&str] = &["valueDate", "value", "valueString", "content", "text"];
const STRING_LITERAL_KEYS: &[&str] = &["valueString", "value", "content", "text"];

/// Literal nodes nest at most a couple of levels (`valueCurrency.amount`).
const MAX_LITERAL_DEPTH: usize = 4;

static DOT_NUMBER: OnceLock<Regex> = OnceLock::new();
static COMMA_NUMBER: OnceLock<Regex> = OnceLock::new();
static CURRENCY_CODE: OnceLock<Regex> = OnceLock::new();

fn number_pattern(format: NumberFormat) -> &'static Regex {
    match format {
        NumberFormat::DotDecimal => DOT_NUMBER.get_or_init(|| {
            Regex::new(r"\d(?:[\d,]*\d)?(?:\.\d+)?").expect("static regex")
        }),
        NumberFormat::CommaDecimal => COMMA_NUMBER.get_or_init(|| {
            Regex::new(r"\d(?:[\d.]*\d)?(?:,\d+)?").expect("static regex")
        }),
    }
}

fn currency_pattern() -> &'static Regex {
    CURRENCY_CODE.get_or_init(|| Regex::new(r"\b[A-Z]{3}\b").expect("static regex"))
}

/// First property of a literal node that holds something.
fn literal_inner<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

pub fn coerce_decimal(node: Option<&Value>, format: NumberFormat) -> Coerced<Decimal> {
    decimal_at_depth(node, format, 0)
}

fn decimal_at_depth(node: Option<&Value>, format: NumberFormat, depth: usize) -> Coerced<Decimal> {
    match node {
        None | Some(Value::Null) => Coerced::missing(),
        Some(Value::Number(n)) => match decimal_from_number(n) {
            Some(d) => Coerced::parsed(d),
            None => Coerced::failure(),
        },
        Some(Value::String(s)) => {
            if s.trim().is_empty() {
                Coerced::missing()
            } else {
                match parse_decimal_text(s, format) {
                    Some(d) => Coerced::parsed(d),
                    None => Coerced::failure(),
                }
            }
        }
        Some(Value::Object(obj)) if depth < MAX_LITERAL_DEPTH => {
            match literal_inner(obj, DECIMAL_LITERAL_KEYS) {
                Some(inner) => decimal_at_depth(Some(inner), format, depth + 1),
                None => Coerced::failure(),
            }
        }
        Some(_) => Coerced::failure(),
    }
}

fn decimal_from_number(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    // serde_json prints the shortest round-trip form, so 85.44 stays 85.44.
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
}

/// Parse an amount literal such as `"$1,590 MXN"`, `"($85.44)"` or `"1.234,56 €"`.
///
/// The first numeric token right after a currency symbol wins, else the first
/// numeric token; currency symbols and unit text around it are ignored.
/// Thousands groups must be exactly three digits, so `"1,59"` is rejected
/// rather than read as 159.
pub fn parse_decimal_text(text: &str, format: NumberFormat) -> Option<Decimal> {
    let text = text.trim();
    let pattern = number_pattern(format);
    let m = pattern
        .find_iter(text)
        .find(|m| follows_currency_symbol(&text[..m.start()]))
        .or_else(|| pattern.find(text))?;
    let token = m.as_str();
    let thousands = format.thousands_separator();
    let decimal = format.decimal_separator();

    let (int_part, frac_part) = match token.find(decimal) {
        Some(pos) => (&token[..pos], Some(&token[pos + 1..])),
        None => (token, None),
    };
    let mut groups = int_part.split(thousands);
    let first = groups.next()?;
    if first.is_empty() {
        return None;
    }
    let mut digits = first.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    if let Some(frac) = frac_part {
        digits.push('.');
        digits.push_str(frac);
    }
    let value = Decimal::from_str(&digits).ok()?;

    let prefix = &text[..m.start()];
    let suffix = &text[m.end()..];
    // "1.234,56" under the dot convention: the token stops early, reject it.
    let mut after = suffix.chars();
    if let (Some(sep), Some(next)) = (after.next(), after.next()) {
        if (sep == thousands || sep == decimal) && next.is_ascii_digit() {
            return None;
        }
    }
    let trailing_minus = {
        let mut rest = suffix.trim_start().chars();
        rest.next() == Some('-') && !rest.next().map_or(false, |c| c.is_ascii_digit())
    };
    let lead = prefix.trim_end_matches(|c: char| is_currency_symbol(c) || c.is_whitespace());
    let negative = leading_minus(prefix)
        || trailing_minus
        || (lead.ends_with('(') && suffix.contains(')'));
    Some(if negative { -value } else { value })
}

fn is_currency_symbol(c: char) -> bool {
    matches!(c, '$' | '€' | '£' | '¥' | '₹' | '₩' | '₽' | '¢' | '₱' | '₺' | '₫')
}

fn is_minus(c: char) -> bool {
    c == '-' || c == '\u{2212}'
}

fn follows_currency_symbol(prefix: &str) -> bool {
    prefix
        .trim_end_matches(|c: char| is_minus(c) || c.is_whitespace())
        .ends_with(is_currency_symbol)
}

/// A minus sign touching the number, optionally through currency symbols
/// (`-12.50`, `-$12.50`, `$-12.50`). A hyphen inside a word (`Ref-7`) or set
/// apart by spaces (`MXN - 5.00`) is not a sign.
fn leading_minus(prefix: &str) -> bool {
    let mut rev = prefix.trim_end_matches(is_currency_symbol).chars().rev();
    match rev.next() {
        Some(c) if is_minus(c) => rev
            .next()
            .map_or(true, |before| before.is_whitespace() || before == '(' || is_currency_symbol(before)),
        _ => false,
    }
}

pub fn coerce_date(node: Option<&Value>) -> Coerced<Option<NaiveDate>> {
    date_at_depth(node, 0)
}

fn date_at_depth(node: Option<&Value>, depth: usize) -> Coerced<Option<NaiveDate>> {
    match node {
        None | Some(Value::Null) => Coerced::missing(),
        Some(Value::String(s)) if s.trim().is_empty() => Coerced::missing(),
        Some(Value::String(s)) => match parse_iso_date(s) {
            Some(d) => Coerced::parsed(Some(d)),
            None => Coerced::failure(),
        },
        Some(Value::Object(obj)) if depth < MAX_LITERAL_DEPTH => {
            match literal_inner(obj, DATE_LITERAL_KEYS) {
                Some(inner) => date_at_depth(Some(inner), depth + 1),
                None => Coerced::failure(),
            }
        }
        Some(_) => Coerced::failure(),
    }
}

/// ISO-8601 only. `03/01/2024` is ambiguous and is rejected, never guessed.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

pub fn coerce_string(node: Option<&Value>) -> Coerced<String> {
    string_at_depth(node, 0)
}

fn string_at_depth(node: Option<&Value>, depth: usize) -> Coerced<String> {
    match node {
        None | Some(Value::Null) => Coerced::missing(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Coerced::missing()
            } else {
                Coerced::parsed(trimmed.to_string())
            }
        }
        Some(Value::Number(n)) => Coerced::parsed(n.to_string()),
        Some(Value::Bool(b)) => Coerced::parsed(b.to_string()),
        Some(Value::Object(obj)) if depth < MAX_LITERAL_DEPTH => {
            match literal_inner(obj, STRING_LITERAL_KEYS) {
                Some(inner) => string_at_depth(Some(inner), depth + 1),
                None => Coerced::failure(),
            }
        }
        Some(_) => Coerced::failure(),
    }
}

/// ISO currency code carried by an amount literal: `valueCurrency.currencyCode`,
/// a `currencyCode` property, or a trailing code in the text (`"$1,590 MXN"`).
pub fn currency_code(node: Option<&Value>) -> Option<String> {
    match node? {
        Value::String(s) => currency_pattern()
            .find_iter(s)
            .last()
            .map(|m| m.as_str().to_string()),
        Value::Object(obj) => obj
            .get("valueCurrency")
            .and_then(|v| v.get("currencyCode"))
            .or_else(|| obj.get("currencyCode"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| s.len() == 3)
            .or_else(|| {
                obj.get("content")
                    .filter(|c| c.is_string())
                    .and_then(|c| currency_code(Some(c)))
            }),
        _ => None,
    }
}

/// Text form of a source value for failure reports.
pub fn raw_text(node: &Value) -> String {
    match node {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Status-aware helper for extractors: `Some(value)` when parsed, `None` otherwise.
pub fn optional_decimal(node: Option<&Value>, format: NumberFormat) -> Coerced<Option<Decimal>> {
    let c = coerce_decimal(node, format);
    match c.status {
        CoercionStatus::Parsed => Coerced::parsed(Some(c.value)),
        CoercionStatus::Missing => Coerced::missing(),
        CoercionStatus::Failed => Coerced::failure(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn dot(v: Value) -> Coerced<Decimal> {
        coerce_decimal(Some(&v), NumberFormat::DotDecimal)
    }

    #[test]
    fn strips_symbols_separators_and_units() {
        assert_eq!(dot(json!("$1,590 MXN")).value, d("1590"));
        assert_eq!(dot(json!("$85.44")).value, d("85.44"));
        assert_eq!(dot(json!("112.34")).value, d("112.34"));
        assert_eq!(dot(json!("USD 1,234,567.89")).value, d("1234567.89"));
        assert!(dot(json!("$85.44")).is_parsed());
    }

    #[test]
    fn json_numbers_keep_their_exact_digits() {
        assert_eq!(dot(json!(85.44)).value, d("85.44"));
        assert_eq!(dot(json!(1590)).value, d("1590"));
        assert_eq!(dot(json!(-3)).value, d("-3"));
    }

    #[test]
    fn negatives() {
        assert_eq!(dot(json!("-$85.44")).value, d("-85.44"));
        assert_eq!(dot(json!("($85.44)")).value, d("-85.44"));
        assert_eq!(dot(json!("85.44-")).value, d("-85.44"));
        assert_eq!(dot(json!("$-85.44")).value, d("-85.44"));
    }

    #[test]
    fn hyphens_away_from_the_number_are_not_signs() {
        assert_eq!(dot(json!("Ref-7 $5.00")).value, d("5.00"));
        assert_eq!(dot(json!("MXN - 5.00")).value, d("5.00"));
        assert_eq!(dot(json!("INV-2024 total 12.50")).value, d("2024"));
        assert_eq!(dot(json!("(ref) 3.00 (net)")).value, d("3.00"));
    }

    #[test]
    fn comma_convention_is_configured_not_guessed() {
        let v = json!("1.234,56 €");
        assert_eq!(
            coerce_decimal(Some(&v), NumberFormat::CommaDecimal).value,
            d("1234.56")
        );
        // Same text under the dot convention has a malformed thousands group.
        assert!(dot(v).failed());
    }

    #[test]
    fn failure_and_missing_are_distinct() {
        let bad = dot(json!("n/a"));
        assert!(bad.failed());
        assert_eq!(bad.value, Decimal::ZERO);

        assert!(coerce_decimal(None, NumberFormat::DotDecimal).is_missing());
        assert!(dot(Value::Null).is_missing());
        assert!(dot(json!("   ")).is_missing());
        assert!(dot(json!(true)).failed());
        assert!(dot(json!("1,59")).failed());
    }

    #[test]
    fn nested_literal_nodes_unwrap() {
        let currency = json!({ "type": "currency", "valueCurrency": { "amount": 85.44, "currencyCode": "MXN" } });
        assert_eq!(dot(currency.clone()).value, d("85.44"));
        assert_eq!(currency_code(Some(&currency)).as_deref(), Some("MXN"));

        let content_only = json!({ "content": "$1,590 MXN" });
        assert_eq!(dot(content_only).value, d("1590"));

        let date = json!({ "type": "date", "valueDate": "2024-03-01", "content": "01/03/2024" });
        assert_eq!(
            coerce_date(Some(&date)).value,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );

        let s = json!({ "valueString": "  ACME S.A. de C.V. " });
        assert_eq!(coerce_string(Some(&s)).value, "ACME S.A. de C.V.");
    }

    #[test]
    fn dates_are_iso_only() {
        let parsed = coerce_date(Some(&json!("2024-03-01T10:15:00Z")));
        assert_eq!(parsed.value, NaiveDate::from_ymd_opt(2024, 3, 1));
        let naive = coerce_date(Some(&json!("2024-03-01T10:15:00.250")));
        assert_eq!(naive.value, NaiveDate::from_ymd_opt(2024, 3, 1));

        let ambiguous = coerce_date(Some(&json!("03/01/2024")));
        assert!(ambiguous.failed());
        assert_eq!(ambiguous.value, None);
        assert!(coerce_date(Some(&json!(20240301))).failed());
        assert!(coerce_date(None).is_missing());
    }

    #[test]
    fn strings_from_scalars() {
        assert_eq!(coerce_string(Some(&json!(" F-001 "))).value, "F-001");
        assert_eq!(coerce_string(Some(&json!(1001))).value, "1001");
        assert!(coerce_string(Some(&json!([1, 2]))).failed());
        assert!(coerce_string(Some(&json!(""))).is_missing());
    }

    #[test]
    fn currency_code_from_text() {
        assert_eq!(currency_code(Some(&json!("$1,590 MXN"))).as_deref(), Some("MXN"));
        assert_eq!(currency_code(Some(&json!("$85.44"))), None);
        assert_eq!(currency_code(Some(&json!(85.44))), None);
    }
}
