//! Shape-agnostic extraction by walking the whole property graph.
//!
//! The walker knows nothing about invoices; it reports objects, sequences and
//! scalars to a [`NodeVisitor`]. The invoice visitor matches property names
//! loosely against the field vocabulary.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use super::{count_hint, header_scopes, Candidate, Extractor, FieldReader};
use crate::config::NormalizerConfig;
use crate::error::ExtractionError;
use crate::types::{ExtractorKind, RawNode};
use crate::vocabulary::{
    children_of, get_loose, matches_loosely, HeaderField, ItemField, COUNT_HINT_KEYS, ENVELOPE_KEYS,
    LINE_ITEM_KEYS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// What the walker should do after visiting an object or sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Descend,
    Skip,
}

/// Receives what the walker finds. References live as long as the walked value,
/// so a visitor may keep the nodes it is interested in.
pub trait NodeVisitor<'a> {
    fn visit_object(&mut self, _path: &[PathSegment], _map: &'a Map<String, Value>) -> Walk {
        Walk::Descend
    }

    /// Native arrays and the `children` of projected wrappers alike.
    fn visit_sequence(&mut self, _path: &[PathSegment], _len: usize) -> Walk {
        Walk::Descend
    }

    fn visit_scalar(&mut self, _path: &[PathSegment], _value: &'a Value) {}
}

/// Depth-first, pre-order, in source order. A `{"children": [...]}` wrapper is
/// reported as the sequence it stands for.
pub fn walk<'a>(value: &'a Value, visitor: &mut dyn NodeVisitor<'a>) {
    let mut path = Vec::new();
    walk_at(value, &mut path, visitor);
}

fn walk_at<'a>(value: &'a Value, path: &mut Vec<PathSegment>, visitor: &mut dyn NodeVisitor<'a>) {
    match value {
        Value::Object(map) => {
            if let Some(children) = children_of(map) {
                walk_sequence(children, path, visitor);
                return;
            }
            if visitor.visit_object(path, map) == Walk::Skip {
                return;
            }
            for (key, child) in map {
                path.push(PathSegment::Key(key.clone()));
                walk_at(child, path, visitor);
                path.pop();
            }
        }
        Value::Array(elements) => walk_sequence(elements, path, visitor),
        scalar => visitor.visit_scalar(path, scalar),
    }
}

fn walk_sequence<'a>(elements: &'a [Value], path: &mut Vec<PathSegment>, visitor: &mut dyn NodeVisitor<'a>) {
    if visitor.visit_sequence(path, elements.len()) == Walk::Skip {
        return;
    }
    for (index, element) in elements.iter().enumerate() {
        path.push(PathSegment::Index(index));
        walk_at(element, path, visitor);
        path.pop();
    }
}

/// Collects header values (first match wins, root first) and every object below
/// the root that carries both a description-like and an amount-like property.
#[derive(Default)]
struct InvoiceVisitor<'a> {
    header: HashMap<HeaderField, &'a Value>,
    count_hint: Option<usize>,
    items: Vec<&'a Map<String, Value>>,
    /// Items found below a `lineItems`-like property.
    collected: usize,
}

impl<'a> NodeVisitor<'a> for InvoiceVisitor<'a> {
    fn visit_object(&mut self, path: &[PathSegment], map: &'a Map<String, Value>) -> Walk {
        if !path.is_empty() && !is_envelope(path) && is_line_item(map) {
            if path.iter().any(is_collection_key) {
                self.collected += 1;
            }
            self.items.push(map);
            return Walk::Skip;
        }
        for field in HeaderField::ALL {
            if self.header.contains_key(&field) {
                continue;
            }
            if let Some(value) = get_loose(map, field.aliases()).filter(|v| is_header_value(v)) {
                self.header.insert(field, value);
            }
        }
        if self.count_hint.is_none() {
            self.count_hint = count_hint(get_loose(map, COUNT_HINT_KEYS));
        }
        Walk::Descend
    }
}

fn is_line_item(map: &Map<String, Value>) -> bool {
    get_loose(map, ItemField::Description.aliases()).is_some()
        && get_loose(map, ItemField::Amount.aliases()).is_some()
}

/// `invoiceData` and friends carry invoice-level fields, never a single item.
fn is_envelope(path: &[PathSegment]) -> bool {
    matches!(path, [PathSegment::Key(key)] if ENVELOPE_KEYS.contains(&key.as_str()))
}

fn is_collection_key(segment: &PathSegment) -> bool {
    matches!(segment, PathSegment::Key(key) if matches_loosely(key, LINE_ITEM_KEYS))
}

/// True when a line-item property carries anything an extractor could read.
fn holds_items(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(elements) => !elements.is_empty(),
        Value::Object(map) => children_of(map).map_or(!map.is_empty(), |c| !c.is_empty()),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Scalars and literal nodes qualify; collections never hold a header value.
fn is_header_value(value: &Value) -> bool {
    match value {
        Value::Array(_) => false,
        Value::Object(map) => children_of(map).is_none(),
        _ => true,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IntrospectionExtractor;

impl Extractor for IntrospectionExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Introspection
    }

    fn extract(&self, node: &RawNode, config: &NormalizerConfig) -> Result<Candidate, ExtractionError> {
        let root = node.record();
        if !matches!(root, Value::Object(_) | Value::Array(_)) {
            return Err(ExtractionError::shape_mismatch(
                "introspectable",
                "record is a primitive",
            ));
        }
        let mut visitor = InvoiceVisitor::default();
        walk(root, &mut visitor);

        // A populated line-item property that yielded nothing is not an empty invoice.
        if let Value::Object(map) = root {
            let unread = header_scopes(map)
                .into_iter()
                .find_map(|scope| get_loose(scope, LINE_ITEM_KEYS))
                .filter(|v| holds_items(v));
            if unread.is_some() && visitor.collected == 0 {
                return Err(ExtractionError::shape_mismatch(
                    "introspectable",
                    "line-item property holds nothing recognizable as an item",
                ));
            }
        }

        let mut reader = FieldReader::new(config);
        let header = reader.header(|f| visitor.header.get(&f).copied());
        let items = visitor
            .items
            .iter()
            .enumerate()
            .map(|(index, map)| reader.item(index, |f| get_loose(map, f.aliases())))
            .collect::<Vec<_>>();
        debug!(
            items = items.len(),
            header_fields = visitor.header.len(),
            "introspection extractor walked record"
        );
        Ok(reader.finish(header, items, visitor.count_hint))
    }
}
