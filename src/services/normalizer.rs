//! Normalization orchestrator: detect, extract, validate, fall back.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::NormalizerConfig;
use crate::detect::detect;
use crate::error::{AttemptFailure, ExtractionError, FailureReport, NormalizationError};
use crate::extract::{
    Candidate, DocumentExtractor, Extractor, GenericMapExtractor, IntrospectionExtractor,
    ProjectedExtractor, RoundTripExtractor,
};
use crate::models::{InvoiceRecord, LineItem};
use crate::types::{ExtractorKind, QueryPathHint, RawNode, Shape};

static DOCUMENT: DocumentExtractor = DocumentExtractor;
static PROJECTED: ProjectedExtractor = ProjectedExtractor;
static GENERIC_MAP: GenericMapExtractor = GenericMapExtractor;
static INTROSPECTION: IntrospectionExtractor = IntrospectionExtractor;
static ROUND_TRIP: RoundTripExtractor = RoundTripExtractor;

fn extractor(kind: ExtractorKind) -> &'static dyn Extractor {
    match kind {
        ExtractorKind::Document => &DOCUMENT,
        ExtractorKind::Projected => &PROJECTED,
        ExtractorKind::GenericMap => &GENERIC_MAP,
        ExtractorKind::Introspection => &INTROSPECTION,
        ExtractorKind::RoundTrip => &ROUND_TRIP,
    }
}

/// Extractor order for one record. The detected shape goes first; the hint is
/// consulted only when detection could not decide. The two shape-agnostic
/// fallbacks always close the plan.
pub fn plan(shape: Shape, hint: QueryPathHint) -> Vec<ExtractorKind> {
    let first = ExtractorKind::for_shape(shape)
        .or_else(|| hint.preferred_shape().and_then(ExtractorKind::for_shape));
    first
        .into_iter()
        .chain([ExtractorKind::Introspection, ExtractorKind::RoundTrip])
        .collect()
}

/// Stateless apart from its configuration; share one across threads freely.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn normalize(&self, node: &RawNode, hint: QueryPathHint) -> Result<InvoiceRecord, NormalizationError> {
        let shape = detect(node);
        if let Some(preferred) = hint.preferred_shape() {
            if shape != Shape::Unknown && shape != preferred {
                debug!(%shape, ?hint, "query path hint disagrees with detected shape; using detected");
            }
        }

        let mut failures: Vec<AttemptFailure> = Vec::new();
        for kind in plan(shape, hint) {
            debug!(extractor = %kind, %shape, "extracting");
            let outcome = extractor(kind)
                .extract(node, &self.config)
                .and_then(validate);
            match outcome {
                Ok(candidate) => {
                    let record = into_record(candidate, kind, failures);
                    info!(
                        extractor = %kind,
                        items = record.line_items.len(),
                        fallbacks = record.attempts.len(),
                        "normalized invoice"
                    );
                    return Ok(record);
                }
                Err(err) => {
                    warn!(extractor = %kind, error = %err, "extractor rejected; falling back");
                    failures.push(AttemptFailure::new(kind, &err));
                }
            }
        }

        let report = FailureReport::from_attempts(failures);
        warn!(%report, "normalization exhausted every extractor");
        Err(NormalizationError::ExhaustedFallbacks(report))
    }

    /// Normalize several independent results; each gets its own outcome.
    pub fn normalize_all<'a, I>(&self, nodes: I, hint: QueryPathHint) -> Vec<Result<InvoiceRecord, NormalizationError>>
    where
        I: IntoIterator<Item = &'a RawNode>,
    {
        nodes.into_iter().map(|n| self.normalize(n, hint)).collect()
    }
}

/// Accept a candidate only if it is complete: the count matches any hint the
/// store sent, every item has a description, and the amounts can be summed.
pub fn validate(candidate: Candidate) -> Result<Candidate, ExtractionError> {
    if let Some(expected) = candidate.count_hint {
        if expected != candidate.items.len() {
            return Err(ExtractionError::ItemCountMismatch {
                expected,
                found: candidate.items.len(),
            });
        }
    }
    if let Some(index) = candidate.items.iter().position(|i| i.description.is_none()) {
        return Err(ExtractionError::NullDescription { index });
    }
    candidate
        .items
        .iter()
        .try_fold(Decimal::ZERO, |sum, i| sum.checked_add(i.amount))
        .ok_or(ExtractionError::AmountOverflow)?;
    Ok(candidate)
}

fn into_record(candidate: Candidate, kind: ExtractorKind, attempts: Vec<AttemptFailure>) -> InvoiceRecord {
    let Candidate {
        header,
        items,
        count_hint,
        coercion_failures,
    } = candidate;
    let line_items = items
        .into_iter()
        .map(|d| LineItem {
            description: d.description.unwrap_or_default(),
            amount: d.amount,
            quantity: d.quantity,
            unit_price: d.unit_price,
            tax_category: d.tax_category,
        })
        .collect();
    InvoiceRecord {
        vendor_name: header.vendor_name,
        invoice_number: header.invoice_number,
        currency: header.currency,
        issue_date: header.issue_date,
        due_date: header.due_date,
        subtotal: header.subtotal,
        tax: header.tax,
        total: header.total,
        line_items,
        item_count_hint: count_hint,
        coercion_failures,
        extracted_by: kind,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{DraftItem, Header};
    use serde_json::json;

    fn draft(description: Option<&str>, amount: Decimal) -> DraftItem {
        DraftItem {
            description: description.map(str::to_string),
            amount,
            quantity: None,
            unit_price: None,
            tax_category: None,
        }
    }

    fn candidate(items: Vec<DraftItem>, count_hint: Option<usize>) -> Candidate {
        Candidate {
            header: Header::default(),
            items,
            count_hint,
            coercion_failures: vec![],
        }
    }

    #[test]
    fn plan_puts_detected_shape_first() {
        assert_eq!(
            plan(Shape::Projected, QueryPathHint::WholeDocument),
            vec![
                ExtractorKind::Projected,
                ExtractorKind::Introspection,
                ExtractorKind::RoundTrip
            ]
        );
        assert_eq!(
            plan(Shape::Unknown, QueryPathHint::Projected)[0],
            ExtractorKind::Projected
        );
        assert_eq!(
            plan(Shape::Unknown, QueryPathHint::Unknown),
            vec![ExtractorKind::Introspection, ExtractorKind::RoundTrip]
        );
    }

    #[test]
    fn validation_rejects_count_mismatch() {
        let c = candidate(vec![draft(Some("a"), Decimal::ONE); 10], Some(30));
        assert!(matches!(
            validate(c),
            Err(ExtractionError::ItemCountMismatch { expected: 30, found: 10 })
        ));
    }

    #[test]
    fn validation_rejects_null_description() {
        let c = candidate(vec![draft(Some("a"), Decimal::ONE), draft(None, Decimal::ONE)], None);
        assert!(matches!(validate(c), Err(ExtractionError::NullDescription { index: 1 })));
    }

    #[test]
    fn validation_rejects_overflowing_sum() {
        let c = candidate(vec![draft(Some("a"), Decimal::MAX), draft(Some("b"), Decimal::MAX)], None);
        assert!(matches!(validate(c), Err(ExtractionError::AmountOverflow)));
    }

    #[test]
    fn validation_accepts_empty_invoice() {
        assert!(validate(candidate(vec![], None)).is_ok());
        assert!(validate(candidate(vec![], Some(0))).is_ok());
    }

    #[test]
    fn primitive_exhausts_with_report() {
        let err = Normalizer::default()
            .normalize(&RawNode::new(json!(42)), QueryPathHint::Unknown)
            .unwrap_err();
        let report = err.report();
        assert_eq!(
            report.tried(),
            vec![ExtractorKind::Introspection, ExtractorKind::RoundTrip]
        );
        assert!(!report.count_hint_disputed);
    }

    #[test]
    fn all_extractors_agreeing_on_short_count_dispute_the_hint() {
        let items: Vec<_> = (0..3)
            .map(|i| json!({ "description": format!("Item {}", i), "amount": i }))
            .collect();
        let node = RawNode::new(json!({ "lineItemCount": 4, "lineItems": items }));
        let err = Normalizer::default()
            .normalize(&node, QueryPathHint::WholeDocument)
            .unwrap_err();
        let report = err.report();
        assert_eq!(report.attempts.len(), 3);
        assert!(report.count_hint_disputed);
    }
}
