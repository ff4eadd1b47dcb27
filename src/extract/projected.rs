use serde_json::{Map, Value};
use tracing::debug;

use super::{exact_count_hint, header_scopes, record_object, scoped_exact, Candidate, Extractor, FieldReader};
use crate::config::NormalizerConfig;
use crate::error::ExtractionError;
use crate::types::{ExtractorKind, RawNode};
use crate::vocabulary::{children_of, get_exact, is_children_wrapper, ItemField, LINE_ITEM_KEYS};

const SHAPE: &str = "projected";

/// Filter/JOIN query results: matched items come back as child tokens inside
/// `{"children": [...]}` wrappers, one wrapper or an array of them.
///
/// All wrappers are read and every token in them is kept, however many there are.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectedExtractor;

impl Extractor for ProjectedExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Projected
    }

    fn extract(&self, node: &RawNode, config: &NormalizerConfig) -> Result<Candidate, ExtractionError> {
        let root = record_object(node, SHAPE)?;
        let scopes = header_scopes(root);

        let collection = scoped_exact(&scopes, LINE_ITEM_KEYS)
            .ok_or_else(|| ExtractionError::shape_mismatch(SHAPE, "no line-item property"))?;
        let tokens = child_tokens(collection)?;

        let mut reader = FieldReader::new(config);
        let header = reader.header(|f| scoped_exact(&scopes, f.aliases()));
        let mut items = Vec::with_capacity(tokens.len());
        for (index, token) in tokens.into_iter().enumerate() {
            let item = item_subtree(token).ok_or_else(|| {
                ExtractionError::shape_mismatch(SHAPE, format!("child token {} holds no line item", index))
            })?;
            items.push(reader.item(index, |f| get_exact(item, f.aliases())));
        }
        debug!(items = items.len(), "projected extractor walked child tokens");
        Ok(reader.finish(header, items, exact_count_hint(&scopes)))
    }
}

/// Every child token, in order, across all wrappers.
fn child_tokens(collection: &Value) -> Result<Vec<&Value>, ExtractionError> {
    let wrappers: Vec<&Map<String, Value>> = match collection {
        Value::Object(map) if is_children_wrapper(collection) => vec![map],
        Value::Array(elements) if !elements.is_empty() && elements.iter().all(is_children_wrapper) => {
            elements.iter().filter_map(|e| e.as_object()).collect()
        }
        _ => {
            return Err(ExtractionError::shape_mismatch(
                SHAPE,
                "line items are not wrapped in children containers",
            ));
        }
    };
    Ok(wrappers
        .into_iter()
        .filter_map(children_of)
        .flat_map(|children| children.iter())
        .collect())
}

fn looks_like_item(map: &Map<String, Value>) -> bool {
    get_exact(map, ItemField::Description.aliases()).is_some()
        || get_exact(map, ItemField::Amount.aliases()).is_some()
}

/// The token itself when it carries item fields, otherwise the one object
/// property (the JOIN alias) one level down that does.
fn item_subtree(token: &Value) -> Option<&Map<String, Value>> {
    let map = token.as_object()?;
    if looks_like_item(map) {
        return Some(map);
    }
    map.values()
        .filter_map(|v| v.as_object())
        .find(|inner| looks_like_item(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    fn extract(v: Value) -> Result<Candidate, ExtractionError> {
        ProjectedExtractor.extract(&RawNode::new(v), &NormalizerConfig::default())
    }

    #[test]
    fn reads_past_ten_tokens() {
        let tokens: Vec<Value> = (0..14)
            .map(|i| json!({ "li": { "description": format!("Item {}", i), "amount": format!("${}.50", i) } }))
            .collect();
        let c = extract(json!({ "vendorName": "ACME", "lineItems": { "children": tokens } })).unwrap();
        assert_eq!(c.items.len(), 14);
        assert_eq!(c.items[13].description.as_deref(), Some("Item 13"));
        assert_eq!(c.items[13].amount, Decimal::from_str("13.50").unwrap());
    }

    #[test]
    fn concatenates_wrappers_in_order() {
        let c = extract(json!({
            "lineItems": [
                { "children": [{ "description": "a", "amount": 1 }, { "description": "b", "amount": 2 }] },
                { "children": [{ "li": { "description": "c", "amount": 3 } }] }
            ]
        }))
        .unwrap();
        let names: Vec<_> = c.items.iter().map(|i| i.description.clone().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn rejects_native_arrays() {
        let err = extract(json!({ "lineItems": [{ "description": "a", "amount": 1 }] })).unwrap_err();
        assert!(matches!(err, ExtractionError::ShapeMismatch { expected: "projected", .. }));
    }

    #[test]
    fn rejects_tokens_without_items() {
        let err = extract(json!({ "lineItems": { "children": [{ "li": { "sku": "X" } }] } })).unwrap_err();
        assert!(err.to_string().contains("child token 0"));
    }
}
