//! Structural shape classification of raw store results.

use serde_json::{Map, Value};

use crate::types::{RawNode, Shape};
use crate::vocabulary::{is_children_wrapper, ENVELOPE_KEYS};

/// Classify `node` by its structure alone.
///
/// Projected evidence (a children wrapper, or an array made only of wrappers)
/// wins over document evidence (a native array of scalars or objects), since a
/// projected record may still carry plain arrays such as tags.
pub fn detect(node: &RawNode) -> Shape {
    match node.record() {
        Value::Object(map) if !map.is_empty() => classify_object(map),
        _ => Shape::Unknown,
    }
}

fn classify_object(map: &Map<String, Value>) -> Shape {
    let mut saw_native_array = false;
    for value in body_properties(map) {
        match property_kind(value) {
            PropertyKind::Wrapped => return Shape::Projected,
            PropertyKind::NativeArray => saw_native_array = true,
            PropertyKind::Other => {}
        }
    }
    if saw_native_array {
        Shape::Document
    } else {
        Shape::GenericMap
    }
}

/// Root properties plus those of an `invoiceData`-style envelope.
pub(crate) fn body_properties(map: &Map<String, Value>) -> impl Iterator<Item = &Value> {
    let envelope = ENVELOPE_KEYS
        .iter()
        .find_map(|k| map.get(*k))
        .and_then(|v| v.as_object());
    map.values().chain(envelope.into_iter().flat_map(|e| e.values()))
}

enum PropertyKind {
    Wrapped,
    NativeArray,
    Other,
}

fn property_kind(value: &Value) -> PropertyKind {
    if is_children_wrapper(value) {
        return PropertyKind::Wrapped;
    }
    match value {
        Value::Array(elements) if !elements.is_empty() && elements.iter().all(is_children_wrapper) => {
            PropertyKind::Wrapped
        }
        Value::Array(_) => PropertyKind::NativeArray,
        _ => PropertyKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape(v: Value) -> Shape {
        detect(&RawNode::new(v))
    }

    #[test]
    fn native_arrays_are_document_shape() {
        assert_eq!(
            shape(json!({ "vendorName": "ACME", "lineItems": [{ "description": "a", "amount": 1 }] })),
            Shape::Document
        );
        assert_eq!(shape(json!({ "lineItems": [] })), Shape::Document);
        assert_eq!(shape(json!({ "tags": ["a", "b"] })), Shape::Document);
    }

    #[test]
    fn wrappers_are_projected_shape() {
        assert_eq!(
            shape(json!({ "lineItems": { "children": [{ "li": { "description": "a" } }] } })),
            Shape::Projected
        );
        assert_eq!(
            shape(json!({ "tags": ["x"], "lineItems": [{ "children": [] }, { "children": [] }] })),
            Shape::Projected
        );
    }

    #[test]
    fn mixed_array_is_not_projected() {
        assert_eq!(
            shape(json!({ "lineItems": [{ "children": [] }, { "description": "a" }] })),
            Shape::Document
        );
    }

    #[test]
    fn envelope_properties_count() {
        assert_eq!(
            shape(json!({ "id": "1", "invoiceData": { "lineItems": { "children": [] } } })),
            Shape::Projected
        );
        assert_eq!(
            shape(json!({ "id": "1", "invoiceData": { "lineItems": [] } })),
            Shape::Document
        );
    }

    #[test]
    fn flat_maps_are_generic() {
        assert_eq!(
            shape(json!({ "vendorName": "ACME", "lineItems": { "0": { "description": "a" } } })),
            Shape::GenericMap
        );
        assert_eq!(shape(json!({ "lineItems.0.amount": "1.00" })), Shape::GenericMap);
    }

    #[test]
    fn empty_and_primitive_are_unknown() {
        assert_eq!(shape(json!({})), Shape::Unknown);
        assert_eq!(shape(json!([])), Shape::Unknown);
        assert_eq!(shape(json!(42)), Shape::Unknown);
        assert_eq!(shape(json!("text")), Shape::Unknown);
        assert_eq!(shape(Value::Null), Shape::Unknown);
        assert_eq!(shape(json!([{ "a": 1 }, { "a": 2 }])), Shape::Unknown);
    }

    #[test]
    fn single_row_result_set_is_unwrapped() {
        assert_eq!(shape(json!([{ "lineItems": [] }])), Shape::Document);
    }
}
