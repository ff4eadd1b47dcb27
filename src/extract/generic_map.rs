use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

use super::{exact_count_hint, header_scopes, record_object, scoped_exact, Candidate, Extractor, FieldReader};
use crate::config::NormalizerConfig;
use crate::detect::detect;
use crate::error::ExtractionError;
use crate::types::{ExtractorKind, RawNode, Shape};
use crate::vocabulary::{get_exact, LINE_ITEM_KEYS};

const SHAPE: &str = "generic-map";

static FLAT_ITEM_KEY: OnceLock<Regex> = OnceLock::new();

/// `lineItems.3.amount` or `lineItems[3].amount`.
fn flat_item_key() -> &'static Regex {
    FLAT_ITEM_KEY.get_or_init(|| {
        Regex::new(r"^(?:lineItems|line_items|items)(?:\.(\d+)|\[(\d+)\])\.(\w+)$").expect("static regex")
    })
}

/// Key/value records without native arrays: items are a map keyed by position
/// or flattened `lineItems.N.field` keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericMapExtractor;

impl Extractor for GenericMapExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::GenericMap
    }

    fn extract(&self, node: &RawNode, config: &NormalizerConfig) -> Result<Candidate, ExtractionError> {
        let shape = detect(node);
        if shape != Shape::GenericMap {
            return Err(ExtractionError::shape_mismatch(SHAPE, format!("node is {} shaped", shape)));
        }
        let root = record_object(node, SHAPE)?;
        let scopes = header_scopes(root);

        let rows = match scoped_exact(&scopes, LINE_ITEM_KEYS) {
            Some(Value::Object(keyed)) => keyed_rows(keyed)?,
            Some(_) => {
                return Err(ExtractionError::shape_mismatch(SHAPE, "line items are not a map"));
            }
            None => {
                let rows = flattened_rows(&scopes);
                if rows.is_empty() {
                    return Err(ExtractionError::shape_mismatch(SHAPE, "no line-item map or flattened item keys"));
                }
                rows
            }
        };

        let mut reader = FieldReader::new(config);
        let header = reader.header(|f| scoped_exact(&scopes, f.aliases()));
        let items = rows
            .iter()
            .enumerate()
            .map(|(index, row)| reader.item(index, |f| get_exact(row, f.aliases())))
            .collect::<Vec<_>>();
        debug!(items = items.len(), "generic-map extractor read rows");
        Ok(reader.finish(header, items, exact_count_hint(&scopes)))
    }
}

/// `{"0": {...}, "1": {...}}` in numeric key order; other keys keep map order.
fn keyed_rows(keyed: &Map<String, Value>) -> Result<Vec<Map<String, Value>>, ExtractionError> {
    let mut rows: Vec<(Option<usize>, Map<String, Value>)> = Vec::with_capacity(keyed.len());
    for (key, value) in keyed {
        let row = value.as_object().ok_or_else(|| {
            ExtractionError::shape_mismatch(SHAPE, format!("line item '{}' is not a map", key))
        })?;
        rows.push((key.parse().ok(), row.clone()));
    }
    if rows.iter().all(|(pos, _)| pos.is_some()) {
        rows.sort_by_key(|(pos, _)| *pos);
    }
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

/// Group `lineItems.N.field` keys from every scope into rows ordered by N.
fn flattened_rows(scopes: &[&Map<String, Value>]) -> Vec<Map<String, Value>> {
    let mut rows: BTreeMap<usize, Map<String, Value>> = BTreeMap::new();
    for scope in scopes {
        for (key, value) in scope.iter() {
            let Some(caps) = flat_item_key().captures(key) else {
                continue;
            };
            let index = caps
                .get(1)
                .or_else(|| caps.get(2))
                .and_then(|m| m.as_str().parse::<usize>().ok());
            if let (Some(index), Some(field)) = (index, caps.get(3)) {
                rows.entry(index)
                    .or_default()
                    .entry(field.as_str().to_string())
                    .or_insert_with(|| value.clone());
            }
        }
    }
    rows.into_values().collect()
}
