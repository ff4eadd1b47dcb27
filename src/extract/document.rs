use serde_json::Value;
use tracing::debug;

use super::{exact_count_hint, header_scopes, record_object, scoped_exact, Candidate, Extractor, FieldReader};
use crate::config::NormalizerConfig;
use crate::error::ExtractionError;
use crate::types::{ExtractorKind, RawNode};
use crate::vocabulary::{get_exact, is_children_wrapper, LINE_ITEM_KEYS};

const SHAPE: &str = "document";

/// Whole-document query results: `lineItems` is a native array of item objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl Extractor for DocumentExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Document
    }

    fn extract(&self, node: &RawNode, config: &NormalizerConfig) -> Result<Candidate, ExtractionError> {
        let root = record_object(node, SHAPE)?;
        let scopes = header_scopes(root);

        let elements = match scoped_exact(&scopes, LINE_ITEM_KEYS) {
            Some(Value::Array(elements)) => elements,
            Some(_) => {
                return Err(ExtractionError::shape_mismatch(SHAPE, "line items are not an array"));
            }
            None => {
                return Err(ExtractionError::shape_mismatch(SHAPE, "no line-item array"));
            }
        };
        if !elements.is_empty() && elements.iter().all(is_children_wrapper) {
            return Err(ExtractionError::shape_mismatch(
                SHAPE,
                "line items are wrapped in children containers",
            ));
        }

        let mut reader = FieldReader::new(config);
        let header = reader.header(|f| scoped_exact(&scopes, f.aliases()));
        let mut items = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let map = element.as_object().ok_or_else(|| {
                ExtractionError::shape_mismatch(SHAPE, format!("line item {} is not an object", index))
            })?;
            items.push(reader.item(index, |f| get_exact(map, f.aliases())));
        }
        debug!(items = items.len(), "document extractor walked line items");
        Ok(reader.finish(header, items, exact_count_hint(&scopes)))
    }
}
