use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use super::{count_hint, Candidate, Extractor, FieldReader};
use crate::config::NormalizerConfig;
use crate::error::ExtractionError;
use crate::types::{ExtractorKind, RawNode};
use crate::vocabulary::{get_loose, HeaderField, ItemField, COUNT_HINT_KEYS, ENVELOPE_KEYS, LINE_ITEM_KEYS};

/// Wire form of one line item. Scalars stay raw JSON so the configured number
/// convention still applies when they are coerced.
#[derive(Debug, Default)]
struct WireLineItem {
    description: Option<Value>,
    amount: Option<Value>,
    quantity: Option<Value>,
    unit_price: Option<Value>,
    tax_category: Option<Value>,
}

/// Synonyms resolve in vocabulary order, so a record carrying both
/// `amount` and `price` keeps `amount` instead of failing as a duplicate.
impl<'de> Deserialize<'de> for WireLineItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let pick = |field: ItemField| get_loose(&map, field.aliases()).cloned();
        Ok(Self {
            description: pick(ItemField::Description),
            amount: pick(ItemField::Amount),
            quantity: pick(ItemField::Quantity),
            unit_price: pick(ItemField::UnitPrice),
            tax_category: pick(ItemField::TaxCategory),
        })
    }
}

#[derive(Debug, Default)]
struct WireInvoice {
    header: HashMap<HeaderField, Value>,
    line_items: Vec<WireLineItem>,
    line_item_count: Option<usize>,
    invoice_data: Option<Box<WireInvoice>>,
}

impl<'de> Deserialize<'de> for WireInvoice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let header = HeaderField::ALL
            .into_iter()
            .filter_map(|f| get_loose(&map, f.aliases()).map(|v| (f, v.clone())))
            .collect();
        let line_items = match get_loose(&map, LINE_ITEM_KEYS) {
            Some(value) => sequence_or_encoded(value.clone()).map_err(de::Error::custom)?,
            None => Vec::new(),
        };
        let invoice_data = ENVELOPE_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .filter(|v| v.is_object())
            .map(|v| WireInvoice::deserialize(v.clone()).map(Box::new))
            .transpose()
            .map_err(de::Error::custom)?;
        Ok(Self {
            header,
            line_items,
            line_item_count: count_hint(get_loose(&map, COUNT_HINT_KEYS)),
            invoice_data,
        })
    }
}

/// Line items as a JSON array, or as a string holding one (double-encoded by the writer).
fn sequence_or_encoded(value: Value) -> Result<Vec<WireLineItem>, serde_json::Error> {
    match value {
        Value::String(text) => serde_json::from_str(&text),
        other @ Value::Array(_) => serde_json::from_value(other),
        other => Err(de::Error::custom(format!(
            "expected a line-item sequence, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl WireInvoice {
    /// Envelope fields win; the root fills what the envelope lacks.
    fn flatten(mut self) -> WireInvoice {
        let Some(inner) = self.invoice_data.take() else {
            return self;
        };
        let mut inner = inner.flatten();
        for (field, value) in self.header {
            inner.header.entry(field).or_insert(value);
        }
        if inner.line_items.is_empty() {
            inner.line_items = self.line_items;
        }
        inner.line_item_count = inner.line_item_count.or(self.line_item_count);
        inner
    }
}

impl WireLineItem {
    fn field(&self, field: ItemField) -> Option<&Value> {
        match field {
            ItemField::Description => self.description.as_ref(),
            ItemField::Amount => self.amount.as_ref(),
            ItemField::Quantity => self.quantity.as_ref(),
            ItemField::UnitPrice => self.unit_price.as_ref(),
            ItemField::TaxCategory => self.tax_category.as_ref(),
        }
    }
}

/// Last resort: print the node as canonical JSON text and let serde read it
/// straight into the wire model. Deserialization errors are returned as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundTripExtractor;

impl Extractor for RoundTripExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::RoundTrip
    }

    fn extract(&self, node: &RawNode, config: &NormalizerConfig) -> Result<Candidate, ExtractionError> {
        let text = serde_json::to_string(node.record())?;
        let wire = serde_json::from_str::<WireInvoice>(&text)?.flatten();

        let mut reader = FieldReader::new(config);
        let header = reader.header(|f| wire.header.get(&f));
        let items = wire
            .line_items
            .iter()
            .enumerate()
            .map(|(index, item)| reader.item(index, |f| item.field(f)))
            .collect::<Vec<_>>();
        debug!(items = items.len(), bytes = text.len(), "round-trip extractor re-parsed record");
        Ok(reader.finish(header, items, wire.line_item_count))
    }
}
