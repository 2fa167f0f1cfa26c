//! Error envelope types and helpers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata attached to errors for diagnostics.
pub type ErrorMetadata = BTreeMap<String, String>;

/// High-level classification of error origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Expected failures (malformed user input, rejected requests).
    Expected,
    /// Invariant violations inside the engine or its caller. These signal
    /// a bug, not a user input problem, and abort the operation outright.
    Invariant,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected => formatter.write_str("expected"),
            Self::Invariant => formatter.write_str("invariant"),
        }
    }
}

/// Stable error code with namespace and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode {
    namespace: String,
    code: String,
}

impl ErrorCode {
    /// Create a new error code with a namespace and code.
    pub fn new(namespace: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            code: code.into(),
        }
    }

    /// Invalid input code.
    pub fn invalid_input() -> Self {
        Self::new("core", "invalid_input")
    }

    /// Internal failure code.
    pub fn internal() -> Self {
        Self::new("core", "internal")
    }

    /// Internal-consistency violation code (snapshot/live-graph drift).
    pub fn internal_consistency() -> Self {
        Self::new("core", "internal_consistency")
    }

    /// Returns the namespace portion.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the code identifier.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.namespace, self.code)
    }
}

/// Structured error envelope shared across crates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error kind describing the origin category.
    pub kind: ErrorKind,
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Additional diagnostic metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: ErrorMetadata,
}

impl ErrorEnvelope {
    /// Create an expected error.
    pub fn expected(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Expected,
            code,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Create an invariant error.
    pub fn invariant(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Invariant,
            code,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Returns true when the error signals an invariant violation.
    #[must_use]
    pub fn is_invariant(&self) -> bool {
        self.kind == ErrorKind::Invariant
    }

    /// Attach a single metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} {}: {}",
            self.kind, self.code, self.message
        )
    }
}

impl std::error::Error for ErrorEnvelope {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_constructors() {
        let expected = ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid");
        assert_eq!(expected.kind, ErrorKind::Expected);
        assert_eq!(expected.code, ErrorCode::invalid_input());
        assert!(!expected.is_invariant());

        let invariant = ErrorEnvelope::invariant(ErrorCode::internal_consistency(), "drift");
        assert_eq!(invariant.kind, ErrorKind::Invariant);
        assert!(invariant.is_invariant());
    }

    #[test]
    fn metadata_accumulates() {
        let error = ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad")
            .with_metadata("field", "name")
            .with_metadata("path", "root.name");

        assert_eq!(
            error.metadata.get("field").map(String::as_str),
            Some("name")
        );
        assert_eq!(
            error.metadata.get("path").map(String::as_str),
            Some("root.name")
        );
    }

    #[test]
    fn envelope_display_includes_code_and_message() {
        let error = ErrorEnvelope::invariant(ErrorCode::internal(), "boom");
        let rendered = error.to_string();

        assert!(rendered.contains("invariant"));
        assert!(rendered.contains("core:internal"));
        assert!(rendered.contains("boom"));
    }

    #[test]
    fn envelope_round_trips_through_json() -> Result<(), serde_json::Error> {
        let error = ErrorEnvelope::expected(ErrorCode::new("schema", "dangling_key"), "missing")
            .with_metadata("key", "Shape.abc");
        let encoded = serde_json::to_string(&error)?;
        let decoded: ErrorEnvelope = serde_json::from_str(&encoded)?;

        assert_eq!(decoded, error);
        Ok(())
    }
}
