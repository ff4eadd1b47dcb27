use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One query result exactly as the document-store client handed it over.
///
/// The normalizer only ever borrows the inner value.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode(Value);

impl RawNode {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The record itself: a single-row result set `[ {...} ]` is unwrapped.
    pub fn record(&self) -> &Value {
        match &self.0 {
            Value::Array(rows) if rows.len() == 1 => &rows[0],
            other => other,
        }
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for RawNode {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Physical shape of a raw node, decided structurally by [`crate::detect::detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Shape {
    Document,
    Projected,
    GenericMap,
    Unknown,
}

impl Shape {
    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Document => "document",
            Shape::Projected => "projected",
            Shape::GenericMap => "generic-map",
            Shape::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which query path produced the node. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryPathHint {
    WholeDocument,
    Projected,
    #[default]
    Unknown,
}

impl QueryPathHint {
    pub fn preferred_shape(self) -> Option<Shape> {
        match self {
            QueryPathHint::WholeDocument => Some(Shape::Document),
            QueryPathHint::Projected => Some(Shape::Projected),
            QueryPathHint::Unknown => None,
        }
    }
}

impl std::str::FromStr for QueryPathHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole" | "document" | "whole-document" => Ok(Self::WholeDocument),
            "projected" | "join" => Ok(Self::Projected),
            "unknown" | "" => Ok(Self::Unknown),
            other => Err(format!("unknown query path hint '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractorKind {
    Document,
    Projected,
    GenericMap,
    Introspection,
    RoundTrip,
}

impl ExtractorKind {
    pub fn for_shape(shape: Shape) -> Option<Self> {
        match shape {
            Shape::Document => Some(Self::Document),
            Shape::Projected => Some(Self::Projected),
            Shape::GenericMap => Some(Self::GenericMap),
            Shape::Unknown => None,
        }
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExtractorKind::Document => "document",
            ExtractorKind::Projected => "projected",
            ExtractorKind::GenericMap => "generic-map",
            ExtractorKind::Introspection => "introspection",
            ExtractorKind::RoundTrip => "round-trip",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoercionStatus {
    Parsed,
    /// Field absent or null; the default was used.
    Missing,
    /// Field present but unparseable; the default was used.
    Failed,
}

/// Result of a scalar coercion: always a value, plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub status: CoercionStatus,
}

impl<T> Coerced<T> {
    pub fn parsed(value: T) -> Self {
        Self {
            value,
            status: CoercionStatus::Parsed,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.status == CoercionStatus::Parsed
    }

    pub fn is_missing(&self) -> bool {
        self.status == CoercionStatus::Missing
    }

    pub fn failed(&self) -> bool {
        self.status == CoercionStatus::Failed
    }

    /// `Some` only when the source actually held a parseable value.
    pub fn ok(self) -> Option<T> {
        match self.status {
            CoercionStatus::Parsed => Some(self.value),
            _ => None,
        }
    }
}

impl<T: Default> Coerced<T> {
    pub fn missing() -> Self {
        Self {
            value: T::default(),
            status: CoercionStatus::Missing,
        }
    }

    pub fn failure() -> Self {
        Self {
            value: T::default(),
            status: CoercionStatus::Failed,
        }
    }
}

/// A field that was present in the source but replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoercionFailure {
    pub field: String,
    pub raw: String,
}
