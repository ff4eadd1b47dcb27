use serde::Serialize;
use thiserror::Error;

use crate::types::ExtractorKind;

/// Why a single extractor attempt did not produce an acceptable record.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("node does not match {expected} shape: {reason}")]
    ShapeMismatch {
        expected: &'static str,
        reason: String,
    },

    #[error("store reports {expected} line items but {found} were extracted")]
    ItemCountMismatch { expected: usize, found: usize },

    #[error("line item {index} has no description")]
    NullDescription { index: usize },

    #[error("line item amounts overflow when summed")]
    AmountOverflow,

    #[error("round-trip deserialization failed: {0}")]
    RoundTrip(#[from] serde_json::Error),
}

impl ExtractionError {
    pub(crate) fn shape_mismatch(expected: &'static str, reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected,
            reason: reason.into(),
        }
    }
}

/// One row of the diagnostic trace: which extractor ran and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptFailure {
    pub extractor: ExtractorKind,
    pub reason: String,
    /// Items the extractor produced when it was rejected for a count mismatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_count: Option<usize>,
}

impl AttemptFailure {
    pub(crate) fn new(extractor: ExtractorKind, err: &ExtractionError) -> Self {
        let extracted_count = match err {
            ExtractionError::ItemCountMismatch { found, .. } => Some(*found),
            _ => None,
        };
        Self {
            extractor,
            reason: err.to_string(),
            extracted_count,
        }
    }
}

/// Structured report returned when every extractor has been tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub attempts: Vec<AttemptFailure>,
    /// Set when every attempt was rejected for a count mismatch and all of them
    /// extracted the same number of items, i.e. the store's hint is the outlier.
    pub count_hint_disputed: bool,
}

impl FailureReport {
    pub(crate) fn from_attempts(attempts: Vec<AttemptFailure>) -> Self {
        let counts: Vec<Option<usize>> = attempts.iter().map(|a| a.extracted_count).collect();
        let count_hint_disputed = counts.len() > 1
            && counts.iter().all(|c| c.is_some())
            && counts.windows(2).all(|w| w[0] == w[1]);
        Self {
            attempts,
            count_hint_disputed,
        }
    }

    pub fn tried(&self) -> Vec<ExtractorKind> {
        self.attempts.iter().map(|a| a.extractor).collect()
    }
}

impl std::fmt::Display for FailureReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .attempts
            .iter()
            .map(|a| format!("{}: {}", a.extractor, a.reason))
            .collect();
        write!(f, "{}", parts.join("; "))?;
        if self.count_hint_disputed {
            write!(f, " (all extractors agree; item-count hint disputed)")?;
        }
        Ok(())
    }
}

/// Caller-facing failure of [`crate::Normalizer::normalize`].
#[derive(Error, Debug)]
pub enum NormalizationError {
    #[error("all extractors failed: {0}")]
    ExhaustedFallbacks(FailureReport),
}

impl NormalizationError {
    pub fn report(&self) -> &FailureReport {
        match self {
            Self::ExhaustedFallbacks(report) => report,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown number format '{0}' (expected 'dot' or 'comma')")]
    UnknownNumberFormat(String),

    #[error("invalid currency code '{0}' (expected three ASCII letters)")]
    InvalidCurrency(String),
}
