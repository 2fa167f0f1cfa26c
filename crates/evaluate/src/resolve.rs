//! Mode-aware resolution: default filling and post-processing over the live
//! graph, with the same accumulate-never-fail-fast error semantics as
//! validation.

use crate::context::{TraversalContext, TraversalMode};
use crate::errors::{ConsistencyError, EvaluationError};
use crate::options::{EvaluationOptions, UnknownFieldPolicy};
use crate::validate::{selected_field, validate_value};
use conflux_schema::{ScalarKind, SchemaSnapshot, SnapKind, TypeGraph, TypeKey};
use conflux_shared::ErrorEnvelope;
use serde_json::{Map, Value};

/// Result of a resolving traversal.
///
/// `value` is the resolved tree; positions that failed resolution are
/// dropped from it, so it is only authoritative when `errors` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOutcome {
    /// Resolved output tree. `None` when the root position itself failed.
    pub value: Option<Value>,
    /// Findings accumulated during the traversal.
    pub errors: Vec<EvaluationError>,
}

impl ResolveOutcome {
    /// Returns true when resolution produced a value with no findings.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.value.is_some()
    }
}

/// Resolve a raw value against the live graph, filling declared defaults.
pub fn resolve_defaults(
    graph: &TypeGraph,
    root: &TypeKey,
    value: &Value,
    options: EvaluationOptions,
) -> Result<ResolveOutcome, ErrorEnvelope> {
    run_resolve(graph, root, value, TraversalMode::ResolveDefaults, options)
}

/// Resolve a raw value, filling defaults and running post-processing hooks.
pub fn resolve_and_postprocess(
    graph: &TypeGraph,
    root: &TypeKey,
    value: &Value,
    options: EvaluationOptions,
) -> Result<ResolveOutcome, ErrorEnvelope> {
    run_resolve(
        graph,
        root,
        value,
        TraversalMode::ResolveDefaultsAndPostprocess,
        options,
    )
}

/// Dispatch a traversal in any mode.
///
/// `Validate` snapshots the graph and runs the snapshot-only validator, so
/// all three modes report identical findings for the same input.
pub fn evaluate(
    graph: &TypeGraph,
    root: &TypeKey,
    value: &Value,
    mode: TraversalMode,
    options: EvaluationOptions,
) -> Result<ResolveOutcome, ErrorEnvelope> {
    match mode {
        TraversalMode::Validate => {
            let snapshot = SchemaSnapshot::from_graph(graph, root)?;
            let errors = validate_value(&snapshot, value, options)?;
            Ok(ResolveOutcome {
                value: None,
                errors,
            })
        },
        TraversalMode::ResolveDefaults | TraversalMode::ResolveDefaultsAndPostprocess => {
            run_resolve(graph, root, value, mode, options)
        },
    }
}

fn run_resolve(
    graph: &TypeGraph,
    root: &TypeKey,
    value: &Value,
    mode: TraversalMode,
    options: EvaluationOptions,
) -> Result<ResolveOutcome, ErrorEnvelope> {
    let snapshot = SchemaSnapshot::from_graph(graph, root)?;
    let context = TraversalContext::for_root(graph, &snapshot, root, mode)?;
    let mut errors = Vec::new();
    let resolved = resolve_at(&context, value, options, &mut errors)?;

    tracing::debug!(
        root = %root,
        mode = ?mode,
        findings = errors.len(),
        resolved = resolved.is_some(),
        "resolved value against live graph"
    );
    Ok(ResolveOutcome {
        value: resolved,
        errors,
    })
}

/// Resolve one position and recurse into children. Returns `None` when this
/// position failed; the parent drops it from the output tree.
fn resolve_at(
    context: &TraversalContext<'_>,
    value: &Value,
    options: EvaluationOptions,
    errors: &mut Vec<EvaluationError>,
) -> Result<Option<Value>, ConsistencyError> {
    let resolved = match context.snap().kind {
        SnapKind::Scalar => {
            let kind = scalar_kind(context)?;
            if kind.matches_value(value) {
                Some(value.clone())
            } else {
                errors.push(EvaluationError::type_mismatch(
                    context.stack().clone(),
                    kind.as_str(),
                    value,
                ));
                None
            }
        },
        SnapKind::Array => resolve_array(context, value, options, errors)?,
        SnapKind::Nullable => {
            if value.is_null() {
                Some(Value::Null)
            } else {
                let inner = context.for_nullable_inner()?;
                resolve_at(&inner, value, options, errors)?
            }
        },
        SnapKind::Map => resolve_map(context, value, options, errors)?,
        SnapKind::Shape => resolve_shape(context, value, options, errors)?,
        SnapKind::Selector => resolve_selector(context, value, options, errors)?,
    };

    post_process(context, resolved, errors)
}

/// Run the registered hook for this type, when the mode asks for it.
fn post_process(
    context: &TraversalContext<'_>,
    resolved: Option<Value>,
    errors: &mut Vec<EvaluationError>,
) -> Result<Option<Value>, ConsistencyError> {
    if !context.do_post_process() {
        return Ok(resolved);
    }
    let Some(hook) = context.graph().post_processor(context.type_key()) else {
        return Ok(resolved);
    };
    let Some(value) = resolved else {
        // Nothing resolved here, so there is nothing to transform.
        return Ok(None);
    };

    match hook.post_process(value, &context.stack().render()) {
        Ok(transformed) => Ok(Some(transformed)),
        Err(error) => {
            errors.push(EvaluationError::post_processing(
                context.stack().clone(),
                error.message(),
            ));
            Ok(None)
        },
    }
}

fn resolve_array(
    context: &TraversalContext<'_>,
    value: &Value,
    options: EvaluationOptions,
    errors: &mut Vec<EvaluationError>,
) -> Result<Option<Value>, ConsistencyError> {
    let Some(elements) = value.as_array() else {
        errors.push(EvaluationError::type_mismatch(
            context.stack().clone(),
            "array",
            value,
        ));
        return Ok(None);
    };

    let mut resolved = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let child = context.for_array_index(index)?;
        if let Some(value) = resolve_at(&child, element, options, errors)? {
            resolved.push(value);
        }
    }
    Ok(Some(Value::Array(resolved)))
}

fn resolve_map(
    context: &TraversalContext<'_>,
    value: &Value,
    options: EvaluationOptions,
    errors: &mut Vec<EvaluationError>,
) -> Result<Option<Value>, ConsistencyError> {
    let Some(entries) = value.as_object() else {
        errors.push(EvaluationError::type_mismatch(
            context.stack().clone(),
            "object",
            value,
        ));
        return Ok(None);
    };
    let key_kind = map_key_kind(context)?;

    let mut resolved = Map::new();
    for (key_text, entry) in entries {
        // Key check and value descent are independent; a bad key does not
        // hide errors in its value, but its entry stays out of the output.
        let key_valid = key_kind.matches_key_text(key_text);
        if !key_valid {
            errors.push(EvaluationError::invalid_map_key(
                context.stack().clone(),
                key_text,
                key_kind,
            ));
        }
        let child = context.for_map_value(key_text)?;
        let value = resolve_at(&child, entry, options, errors)?;
        if key_valid {
            if let Some(value) = value {
                resolved.insert(key_text.clone(), value);
            }
        }
    }
    Ok(Some(Value::Object(resolved)))
}

fn resolve_shape(
    context: &TraversalContext<'_>,
    value: &Value,
    options: EvaluationOptions,
    errors: &mut Vec<EvaluationError>,
) -> Result<Option<Value>, ConsistencyError> {
    let Some(entries) = value.as_object() else {
        errors.push(EvaluationError::type_mismatch(
            context.stack().clone(),
            "object",
            value,
        ));
        return Ok(None);
    };
    let fields = composite_fields(context)?;

    let mut resolved = Map::new();
    for field in fields {
        if let Some(entry) = entries.get(&field.name) {
            let child = context.for_field(field)?;
            if let Some(value) = resolve_at(&child, entry, options, errors)? {
                resolved.insert(field.name.clone(), value);
            }
            continue;
        }

        let live_field = context.node().field(&field.name).ok_or_else(|| {
            ConsistencyError::SnapshotDrift {
                key: context.type_key().clone(),
                detail: format!("field {} exists in snapshot but not in live graph", field.name),
                at: context.stack().render(),
            }
        })?;

        if let Some(default) = live_field.default() {
            // Defaults pass back through resolution, so composite defaults
            // have their own nested defaults filled in.
            let materialized = default.materialize();
            let child = context.for_field(field)?;
            if let Some(value) = resolve_at(&child, &materialized, options, errors)? {
                resolved.insert(field.name.clone(), value);
            }
        } else if field.is_required {
            errors.push(EvaluationError::missing_required_field(
                context.stack().for_field(&field.name),
                &field.name,
            ));
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
    Ok(Some(Value::Object(resolved)))
}

fn resolve_selector(
    context: &TraversalContext<'_>,
    value: &Value,
    options: EvaluationOptions,
    errors: &mut Vec<EvaluationError>,
) -> Result<Option<Value>, ConsistencyError> {
    let Some(entries) = value.as_object() else {
        errors.push(EvaluationError::type_mismatch(
            context.stack().clone(),
            "object",
            value,
        ));
        return Ok(None);
    };
    let fields = composite_fields(context)?;

    let field = match selected_field(fields, entries) {
        Ok(field) => field,
        Err(matching) => {
            let declared: Vec<&str> = fields.iter().map(|field| field.name.as_str()).collect();
            errors.push(EvaluationError::ambiguous_selection(
                context.stack().clone(),
                &declared,
                matching,
            ));
            return Ok(None);
        },
    };

    let entry = entries
        .get(&field.name)
        .ok_or_else(|| ConsistencyError::SnapshotDrift {
            key: context.type_key().clone(),
            detail: format!("selected branch {} vanished from input", field.name),
            at: context.stack().render(),
        })?;
    let child = context.for_field(field)?;
    let resolved = resolve_at(&child, entry, options, errors)?;

    Ok(resolved.map(|value| {
        let mut wrapper = Map::new();
        wrapper.insert(field.name.clone(), value);
        Value::Object(wrapper)
    }))
}

fn scalar_kind(context: &TraversalContext<'_>) -> Result<ScalarKind, ConsistencyError> {
    context
        .snap()
        .scalar_kind
        .ok_or_else(|| ConsistencyError::SnapshotDrift {
            key: context.type_key().clone(),
            detail: "scalar snap is missing its scalar kind".to_string(),
            at: context.stack().render(),
        })
}

fn map_key_kind(context: &TraversalContext<'_>) -> Result<ScalarKind, ConsistencyError> {
    context
        .snap()
        .key_kind
        .ok_or_else(|| ConsistencyError::SnapshotDrift {
            key: context.type_key().clone(),
            detail: "map snap is missing its key kind".to_string(),
            at: context.stack().render(),
        })
}

fn composite_fields<'a>(
    context: &TraversalContext<'a>,
) -> Result<&'a [conflux_schema::FieldSnap], ConsistencyError> {
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
