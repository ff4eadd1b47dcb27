//! Turns invoice results from a document store into one canonical record,
//! whatever shape the query path gave them.
//!
//! ```no_run
//! use invoice_normalizer_lib::{normalize, QueryPathHint, RawNode};
//!
//! let node = RawNode::from_json_str(r#"{"vendorName":"ACME","lineItems":[]}"#)?;
//! let record = normalize(&node, QueryPathHint::WholeDocument)?;
//! println!("{}", record.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod coerce;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod models;
pub mod services;
pub mod types;
pub mod vocabulary;

pub use config::{NormalizerConfig, NumberFormat};
pub use detect::detect;
pub use error::{AttemptFailure, ConfigError, ExtractionError, FailureReport, NormalizationError};
pub use models::{format_amount, InvoiceRecord, LineItem};
pub use services::Normalizer;
pub use types::{
    Coerced, CoercionFailure, CoercionStatus, ExtractorKind, QueryPathHint, RawNode, Shape,
};

/// Normalize with the default configuration (dot-decimal amounts, no default currency).
pub fn normalize(node: &RawNode, hint: QueryPathHint) -> Result<InvoiceRecord, NormalizationError> {
    Normalizer::default().normalize(node, hint)
}
