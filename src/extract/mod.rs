//! Extractors: one per physical shape, plus the shape-agnostic fallbacks.
//!
//! Every extractor produces a [`Candidate`]; the orchestrator in
//! `services::normalizer` validates it before it becomes an `InvoiceRecord`.

mod document;
mod generic_map;
mod introspection;
mod projected;
mod round_trip;

pub use document::DocumentExtractor;
pub use generic_map::GenericMapExtractor;
pub use introspection::{walk, IntrospectionExtractor, NodeVisitor, PathSegment, Walk};
pub use projected::ProjectedExtractor;
pub use round_trip::RoundTripExtractor;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::coerce::{coerce_date, coerce_decimal, coerce_string, currency_code, optional_decimal, raw_text};
use crate::config::NormalizerConfig;
use crate::error::ExtractionError;
use crate::types::{Coerced, CoercionFailure, ExtractorKind, RawNode};
use crate::vocabulary::{get_exact, HeaderField, ItemField, COUNT_HINT_KEYS, ENVELOPE_KEYS};

pub trait Extractor: Send + Sync {
    fn kind(&self) -> ExtractorKind;

    fn extract(&self, node: &RawNode, config: &NormalizerConfig) -> Result<Candidate, ExtractionError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub vendor_name: String,
    pub invoice_number: String,
    pub currency: String,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// A line item before validation. `description` is `None` when the source had
/// no description at all, which validation rejects.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftItem {
    pub description: Option<String>,
    pub amount: Decimal,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub tax_category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub header: Header,
    pub items: Vec<DraftItem>,
    pub count_hint: Option<usize>,
    pub coercion_failures: Vec<CoercionFailure>,
}

/// Coerces fields and keeps a per-field record of what had to be defaulted.
pub(crate) struct FieldReader<'c> {
    config: &'c NormalizerConfig,
    failures: Vec<CoercionFailure>,
}

impl<'c> FieldReader<'c> {
    pub(crate) fn new(config: &'c NormalizerConfig) -> Self {
        Self {
            config,
            failures: Vec::new(),
        }
    }

    fn note<T>(&mut self, field: &str, node: Option<&Value>, coerced: &Coerced<T>) {
        if coerced.failed() {
            if let Some(raw) = node {
                self.failures.push(CoercionFailure {
                    field: field.to_string(),
                    raw: raw_text(raw),
                });
            }
        }
    }

    pub(crate) fn string(&mut self, field: &str, node: Option<&Value>) -> String {
        let c = coerce_string(node);
        self.note(field, node, &c);
        c.value
    }

    pub(crate) fn decimal(&mut self, field: &str, node: Option<&Value>) -> Decimal {
        let c = coerce_decimal(node, self.config.number_format);
        self.note(field, node, &c);
        c.value
    }

    pub(crate) fn optional_decimal(&mut self, field: &str, node: Option<&Value>) -> Option<Decimal> {
        let c = optional_decimal(node, self.config.number_format);
        self.note(field, node, &c);
        c.value
    }

    pub(crate) fn date(&mut self, field: &str, node: Option<&Value>) -> Option<NaiveDate> {
        let c = coerce_date(node);
        self.note(field, node, &c);
        c.value
    }

    /// Header fields resolved by `lookup`. Currency falls back to the code
    /// carried by the total's literal, then to the configured default.
    pub(crate) fn header<'a, F>(&mut self, lookup: F) -> Header
    where
        F: Fn(HeaderField) -> Option<&'a Value>,
    {
        let total_node = lookup(HeaderField::Total);
        let mut currency = self.string(HeaderField::Currency.name(), lookup(HeaderField::Currency));
        if currency.is_empty() {
            currency = currency_code(total_node)
                .or_else(|| self.config.default_currency.clone())
                .unwrap_or_default();
        }
        Header {
            vendor_name: self.string(HeaderField::VendorName.name(), lookup(HeaderField::VendorName)),
            invoice_number: self.string(
                HeaderField::InvoiceNumber.name(),
                lookup(HeaderField::InvoiceNumber),
            ),
            currency: currency.to_ascii_uppercase(),
            issue_date: self.date(HeaderField::IssueDate.name(), lookup(HeaderField::IssueDate)),
            due_date: self.date(HeaderField::DueDate.name(), lookup(HeaderField::DueDate)),
            subtotal: self.decimal(HeaderField::Subtotal.name(), lookup(HeaderField::Subtotal)),
            tax: self.decimal(HeaderField::Tax.name(), lookup(HeaderField::Tax)),
            total: self.decimal(HeaderField::Total.name(), total_node),
        }
    }

    /// One line item; `index` only labels failure reports (`lineItems[3].amount`).
    pub(crate) fn item<'a, F>(&mut self, index: usize, lookup: F) -> DraftItem
    where
        F: Fn(ItemField) -> Option<&'a Value>,
    {
        let label = |f: ItemField| format!("lineItems[{}].{}", index, f.name());
        let description = lookup(ItemField::Description)
            .filter(|v| !v.is_null())
            .map(|v| self.string(&label(ItemField::Description), Some(v)));
        let tax_category = lookup(ItemField::TaxCategory)
            .map(|v| self.string(&label(ItemField::TaxCategory), Some(v)))
            .filter(|s| !s.is_empty());
        DraftItem {
            description,
            amount: self.decimal(&label(ItemField::Amount), lookup(ItemField::Amount)),
            quantity: self.optional_decimal(&label(ItemField::Quantity), lookup(ItemField::Quantity)),
            unit_price: self
                .optional_decimal(&label(ItemField::UnitPrice), lookup(ItemField::UnitPrice)),
            tax_category,
        }
    }

    pub(crate) fn finish(self, header: Header, items: Vec<DraftItem>, count_hint: Option<usize>) -> Candidate {
        Candidate {
            header,
            items,
            count_hint,
            coercion_failures: self.failures,
        }
    }
}

/// Maps header fields are read from: an `invoiceData`-style envelope first, then the root.
pub(crate) fn header_scopes(root: &Map<String, Value>) -> Vec<&Map<String, Value>> {
    let mut scopes = Vec::with_capacity(2);
    if let Some(envelope) = ENVELOPE_KEYS
        .iter()
        .find_map(|k| root.get(*k))
        .and_then(|v| v.as_object())
    {
        scopes.push(envelope);
    }
    scopes.push(root);
    scopes
}

/// First scope holding any of `aliases`, exact key match.
pub(crate) fn scoped_exact<'a>(scopes: &[&'a Map<String, Value>], aliases: &[&str]) -> Option<&'a Value> {
    scopes.iter().find_map(|m| get_exact(m, aliases))
}

/// Store-reported item count, accepted as a non-negative integer or numeric string.
pub(crate) fn count_hint(node: Option<&Value>) -> Option<usize> {
    match node? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn exact_count_hint(scopes: &[&Map<String, Value>]) -> Option<usize> {
    count_hint(scoped_exact(scopes, COUNT_HINT_KEYS))
}

/// The record as an object, or a shape mismatch naming what was expected.
pub(crate) fn record_object<'a>(
    node: &'a RawNode,
    expected: &'static str,
) -> Result<&'a Map<String, Value>, ExtractionError> {
    node.record()
        .as_object()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ExtractionError::shape_mismatch(expected, "record is not a non-empty object"))
}
