//! Expense extraction pipeline
//!
//! Free text goes in, a validated `ExpenseRecord` comes out:
//!
//! ```text
//! TextRequest -> prompt -> generative backend -> sanitize -> parse -> ExpenseRecord
//! ```
//!
//! The backend is untrusted free-text generation, so each stage returns a
//! tagged result instead of erroring out. Callers get either a record or an
//! `ExtractionFailure` describing which stage gave up.

mod parse;
mod pipeline;
mod sanitize;

pub use parse::{parse, ExpenseFields};
pub use pipeline::{build_prompt, ExtractionPipeline};
pub use sanitize::sanitize;

use serde::{Deserialize, Serialize};

/// Fields the model must return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredField {
    Price,
    Category,
}

impl RequiredField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Category => "category",
        }
    }
}

impl std::fmt::Display for RequiredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a sanitized payload could not become an expense
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing required field `{0}`")]
    MissingField(RequiredField),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}

impl ParseFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::MalformedPayload(_) => FailureReason::MalformedPayload,
            Self::MissingField(field) => FailureReason::MissingField { field: *field },
            Self::InvalidPrice(_) => FailureReason::InvalidPrice,
        }
    }
}

/// Tag describing which stage of extraction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// Backend call failed at the transport level
    BackendUnavailable,
    /// Backend call exceeded the configured timeout
    BackendTimeout,
    /// Nothing left after sanitizing the response
    EmptyResponse,
    MalformedPayload,
    MissingField { field: RequiredField },
    InvalidPrice,
}

impl FailureReason {
    /// Transport failures may be retried; content failures never are
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendUnavailable | Self::BackendTimeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackendUnavailable => "backend_unavailable",
            Self::BackendTimeout => "backend_timeout",
            Self::EmptyResponse => "empty_response",
            Self::MalformedPayload => "malformed_payload",
            Self::MissingField { .. } => "missing_field",
            Self::InvalidPrice => "invalid_price",
        }
    }
}

/// Structured extraction failure reported to callers
///
/// Serializes flat, e.g. `{"reason": "missing_field", "field": "category", "detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{detail}")]
pub struct ExtractionFailure {
    #[serde(flatten)]
    pub reason: FailureReason,
    pub detail: String,
}

impl ExtractionFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl From<ParseFailure> for ExtractionFailure {
    fn from(failure: ParseFailure) -> Self {
        Self::new(failure.reason(), failure.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_flat() {
        let failure = ExtractionFailure::from(ParseFailure::MissingField(RequiredField::Category));
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["reason"], "missing_field");
        assert_eq!(json["field"], "category");
        assert_eq!(json["detail"], "Missing required field `category`");
    }

    #[test]
    fn test_unit_reason_serializes_tag_only() {
        let failure = ExtractionFailure::new(FailureReason::BackendTimeout, "timed out");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["reason"], "backend_timeout");
        assert!(json.get("field").is_none());
    }

    #[test]
    fn test_only_transport_failures_are_transient() {
        assert!(FailureReason::BackendUnavailable.is_transient());
        assert!(FailureReason::BackendTimeout.is_transient());
        assert!(!FailureReason::EmptyResponse.is_transient());
        assert!(!FailureReason::InvalidPrice.is_transient());
        assert!(!FailureReason::MissingField {
            field: RequiredField::Price
        }
        .is_transient());
    }
}
