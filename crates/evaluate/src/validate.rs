//! Snapshot-only recursive validation.
//!
//! Validation accumulates findings instead of failing fast: every branch of
//! the raw value is visited even after an error, so one pass reports
//! everything wrong with the input. Only internal-consistency failures abort
//! the traversal.

use crate::context::SnapshotContext;
use crate::errors::{ConsistencyError, EvaluationError};
use crate::options::{EvaluationOptions, UnknownFieldPolicy};
use conflux_schema::{FieldSnap, ScalarKind, SchemaSnapshot, SnapKind};
use conflux_shared::ErrorEnvelope;
use serde_json::Value;

/// Validate a raw value against a schema snapshot.
///
/// Returns the accumulated findings (empty for a valid value). The outer
/// `Err` is reserved for internal-consistency failures, which indicate a bug
/// rather than bad input.
pub fn validate_value(
    snapshot: &SchemaSnapshot,
    value: &Value,
    options: EvaluationOptions,
) -> Result<Vec<EvaluationError>, ErrorEnvelope> {
    let context = SnapshotContext::for_root(snapshot)?;
    let mut errors = Vec::new();
    validate_at(&context, value, options, &mut errors)?;

    tracing::debug!(
        root = %snapshot.root_key(),
        findings = errors.len(),
        "validated value against snapshot"
    );
    Ok(errors)
}

/// Validate one position and recurse into children.
pub(crate) fn validate_at(
    context: &SnapshotContext<'_>,
    value: &Value,
    options: EvaluationOptions,
    errors: &mut Vec<EvaluationError>,
) -> Result<(), ConsistencyError> {
    match context.snap().kind {
        SnapKind::Scalar => {
            let kind = snap_scalar_kind(context)?;
            if !kind.matches_value(value) {
                errors.push(EvaluationError::type_mismatch(
                    context.stack().clone(),
                    kind.as_str(),
                    value,
                ));
            }
        },
        SnapKind::Array => {
            let Some(elements) = value.as_array() else {
                errors.push(EvaluationError::type_mismatch(
                    context.stack().clone(),
                    "array",
                    value,
                ));
                return Ok(());
            };
            for (index, element) in elements.iter().enumerate() {
                let child = context.for_array_index(index)?;
                validate_at(&child, element, options, errors)?;
            }
        },
        SnapKind::Nullable => {
            // Null satisfies the wrapper outright; anything else is checked
            // against the inner type.
            if !value.is_null() {
                let inner = context.for_nullable_inner()?;
                validate_at(&inner, value, options, errors)?;
            }
        },
        SnapKind::Map => {
            let Some(entries) = value.as_object() else {
                errors.push(EvaluationError::type_mismatch(
                    context.stack().clone(),
                    "object",
                    value,
                ));
                return Ok(());
            };
            let key_kind = snap_key_kind(context)?;
            for (key_text, entry) in entries {
                // Key check and value descent are independent; a bad key
                // does not hide errors in its value.
                if !key_kind.matches_key_text(key_text) {
                    errors.push(EvaluationError::invalid_map_key(
                        context.stack().clone(),
                        key_text,
                        key_kind,
                    ));
                }
                let child = context.for_map_value(key_text)?;
                validate_at(&child, entry, options, errors)?;
            }
        },
        SnapKind::Shape => {
            let Some(entries) = value.as_object() else {
                errors.push(EvaluationError::type_mismatch(
                    context.stack().clone(),
                    "object",
                    value,
                ));
                return Ok(());
            };
            let fields = snap_fields(context)?;

            for field in fields {
                match entries.get(&field.name) {
                    Some(entry) => {
                        let child = context.for_field(field)?;
                        validate_at(&child, entry, options, errors)?;
                    },
                    None => {
                        if field.is_required && !field.has_default {
                            errors.push(EvaluationError::missing_required_field(
                                context.stack().for_field(&field.name),
                                &field.name,
                            ));
                        }
                    },
                }
            }

            if options.unknown_fields == UnknownFieldPolicy::Deny {
                for key in entries.keys() {
                    if !fields.iter().any(|field| field.name == *key) {
                        errors.push(EvaluationError::unknown_field(
                            context.stack().for_field(key),
                            key,
                        ));
                    }
                }
            }
        },
        SnapKind::Selector => {
            let Some(entries) = value.as_object() else {
                errors.push(EvaluationError::type_mismatch(
                    context.stack().clone(),
                    "object",
                    value,
                ));
                return Ok(());
            };
            let fields = snap_fields(context)?;

            match selected_field(fields, entries) {
                Ok(field) => {
                    let entry = entries
                        .get(&field.name)
                        .ok_or_else(|| ConsistencyError::SnapshotDrift {
                            key: context.type_key().clone(),
                            detail: format!("selected branch {} vanished from input", field.name),
                            at: context.stack().render(),
                        })?;
                    let child = context.for_field(field)?;
                    validate_at(&child, entry, options, errors)?;
                },
                Err(matching) => {
                    let declared: Vec<&str> =
                        fields.iter().map(|field| field.name.as_str()).collect();
                    errors.push(EvaluationError::ambiguous_selection(
                        context.stack().clone(),
                        &declared,
                        matching,
                    ));
                },
            }
        },
    }
    Ok(())
}

/// The single selected branch, or the number of matching entries when the
/// selection is not exactly one.
pub(crate) fn selected_field<'a>(
    fields: &'a [FieldSnap],
    entries: &serde_json::Map<String, Value>,
) -> Result<&'a FieldSnap, usize> {
    let matching: Vec<&FieldSnap> = fields
        .iter()
        .filter(|field| entries.contains_key(&field.name))
        .collect();

    match (entries.len(), matching.as_slice()) {
        (1, [field]) => Ok(field),
        _ => Err(matching.len()),
    }
}

pub(crate) fn snap_scalar_kind(
    context: &SnapshotContext<'_>,
) -> Result<ScalarKind, ConsistencyError> {
    context
        .snap()
        .scalar_kind
        .ok_or_else(|| ConsistencyError::SnapshotDrift {
            key: context.type_key().clone(),
            detail: "scalar snap is missing its scalar kind".to_string(),
            at: context.stack().render(),
        })
}

pub(crate) fn snap_key_kind(context: &SnapshotContext<'_>) -> Result<ScalarKind, ConsistencyError> {
    context
        .snap()
        .key_kind
        .ok_or_else(|| ConsistencyError::SnapshotDrift {
            key: context.type_key().clone(),
            detail: "map snap is missing its key kind".to_string(),
            at: context.stack().render(),
        })
}

pub(crate) fn snap_fields<'a>(
    context: &SnapshotContext<'a>,
) -> Result<&'a [FieldSnap], ConsistencyError> {
    context
        .snap()
        .fields
        .as_deref()
        .ok_or_else(|| ConsistencyError::SnapshotDrift {
            key: context.type_key().clone(),
            detail: "composite snap is missing its field list".to_string(),
            at: context.stack().render(),
        })
}
