//! Evaluation error taxonomy: accumulated user-input findings and fatal
//! internal-consistency failures.

use crate::stack::EvaluationStack;
use conflux_schema::{ScalarKind, TypeKey};
use conflux_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Classification of an accumulated evaluation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvaluationErrorKind {
    /// Raw value does not coerce to the declared type.
    TypeMismatch,
    /// A required, defaultless field is absent from raw input.
    MissingRequiredField,
    /// Raw input carries a key the shape does not declare.
    UnknownField,
    /// A selector matched zero or more than one declared branch.
    AmbiguousOrMissingSelection,
    /// A map key does not parse as the declared key kind.
    InvalidMapKey,
    /// A post-processing hook failed on a resolved value.
    PostProcessingFailure,
}

impl EvaluationErrorKind {
    /// Stable name for display and serialization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypeMismatch => "type_mismatch",
            Self::MissingRequiredField => "missing_required_field",
            Self::UnknownField => "unknown_field",
            Self::AmbiguousOrMissingSelection => "ambiguous_or_missing_selection",
            Self::InvalidMapKey => "invalid_map_key",
            Self::PostProcessingFailure => "post_processing_failure",
        }
    }
}

impl fmt::Display for EvaluationErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One accumulated finding, tagged with the stack captured at the point of
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationError {
    /// Finding classification.
    pub kind: EvaluationErrorKind,
    /// Stack captured where the finding occurred.
    pub stack: EvaluationStack,
    /// Human-readable message.
    pub message: String,
}

impl EvaluationError {
    /// Create a finding.
    pub fn new(
        kind: EvaluationErrorKind,
        stack: EvaluationStack,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            stack,
            message: message.into(),
        }
    }

    /// Rendered path of the finding.
    #[must_use]
    pub fn path(&self) -> String {
        self.stack.render()
    }

    /// Raw value failed to coerce to the expected type.
    pub fn type_mismatch(stack: EvaluationStack, expected: &str, value: &Value) -> Self {
        let message = format!("expected {expected}, got {}", value_type_name(value));
        Self::new(EvaluationErrorKind::TypeMismatch, stack, message)
    }

    /// Required, defaultless field absent from raw input.
    pub fn missing_required_field(stack: EvaluationStack, name: &str) -> Self {
        Self::new(
            EvaluationErrorKind::MissingRequiredField,
            stack,
            format!("missing required field {name}"),
        )
    }

    /// Undeclared key present in raw input.
    pub fn unknown_field(stack: EvaluationStack, name: &str) -> Self {
        Self::new(
            EvaluationErrorKind::UnknownField,
            stack,
            format!("unknown field {name}"),
        )
    }

    /// Selector matched zero or more than one declared branch.
    pub fn ambiguous_selection(
        stack: EvaluationStack,
        declared: &[&str],
        entries: usize,
    ) -> Self {
        Self::new(
            EvaluationErrorKind::AmbiguousOrMissingSelection,
            stack,
            format!(
                "selector requires exactly one of [{}], got {entries} matching entries",
                declared.join(", ")
            ),
        )
    }

    /// Map key text failed to parse as the declared key kind.
    pub fn invalid_map_key(stack: EvaluationStack, key_text: &str, kind: ScalarKind) -> Self {
        Self::new(
            EvaluationErrorKind::InvalidMapKey,
            stack,
            format!("map key {key_text:?} is not a valid {kind}"),
        )
    }

    /// Post-processing hook failed.
    pub fn post_processing(stack: EvaluationStack, message: &str) -> Self {
        Self::new(
            EvaluationErrorKind::PostProcessingFailure,
            stack,
            format!("post-processing failed: {message}"),
        )
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} at {}: {}",
            self.kind,
            self.stack.render(),
            self.message
        )
    }
}

/// Coarse value description for mismatch messages.
#[must_use]
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Snapshot/live-graph desynchronization or a mis-dispatched descend.
///
/// These are bugs in the engine or its caller, not user input problems.
/// They abort the whole traversal immediately: accumulating findings on a
/// desynchronized graph is meaningless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    /// A type key is absent from the schema snapshot.
    MissingSnapshotEntry {
        /// The missing key.
        key: TypeKey,
        /// Rendered path where the lookup happened.
        at: String,
    },
    /// A type key exists in the snapshot but not in the live graph.
    MissingLiveType {
        /// The missing key.
        key: TypeKey,
        /// Rendered path where the lookup happened.
        at: String,
    },
    /// A descend operation was invoked on the wrong current kind.
    KindMismatch {
        /// Key of the current type.
        key: TypeKey,
        /// Kind the descend requires.
        expected: &'static str,
        /// Kind actually bound.
        actual: &'static str,
        /// Rendered path where the descend happened.
        at: String,
    },
    /// Snapshot and live graph disagree about a node's structure.
    SnapshotDrift {
        /// Key of the drifted type.
        key: TypeKey,
        /// What disagreed.
        detail: String,
        /// Rendered path where the drift surfaced.
        at: String,
    },
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSnapshotEntry { key, at } => {
                write!(formatter, "type key {key} missing from schema snapshot at {at}")
            },
            Self::MissingLiveType { key, at } => {
                write!(formatter, "type key {key} missing from live type map at {at}")
            },
            Self::KindMismatch {
                key,
                expected,
                actual,
                at,
            } => write!(
                formatter,
                "descend requires {expected} but {key} is {actual} at {at}"
            ),
            Self::SnapshotDrift { key, detail, at } => {
                write!(formatter, "snapshot drift for {key} at {at}: {detail}")
            },
        }
    }
}

impl std::error::Error for ConsistencyError {}

impl From<ConsistencyError> for ErrorEnvelope {
    fn from(error: ConsistencyError) -> Self {
        let message = error.to_string();
        let envelope = Self::invariant(ErrorCode::internal_consistency(), message);

        match error {
            ConsistencyError::MissingSnapshotEntry { key, at }
            | ConsistencyError::MissingLiveType { key, at } => envelope
                .with_metadata("key", key.to_string())
                .with_metadata("at", at),
            ConsistencyError::KindMismatch {
                key,
                expected,
                actual,
                at,
            } => envelope
                .with_metadata("key", key.to_string())
                .with_metadata("expected", expected)
                .with_metadata("actual", actual)
                .with_metadata("at", at),
            ConsistencyError::SnapshotDrift { key, detail, at } => envelope
                .with_metadata("key", key.to_string())
                .with_metadata("detail", detail)
                .with_metadata("at", at),
        }
    }
}
