//! End-to-end evaluation semantics: validation findings, default
//! resolution, selector dispatch, and post-processing across a realistic
//! pipeline-style schema.

use conflux_evaluate::{
    evaluate, resolve_and_postprocess, resolve_defaults, validate_value, EvaluationErrorKind,
    EvaluationOptions, TraversalMode,
};
use conflux_schema::{
    DefaultProducer, Field, GraphBuilder, PostProcessError, PostProcessor, ScalarKind,
    SchemaSnapshot, TypeGraph, TypeKey,
};
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;

struct GeneratedRunId;

impl DefaultProducer for GeneratedRunId {
    fn produce(&self) -> Value {
        json!("run-0000")
    }
}

struct NonEmptyAddress;

impl PostProcessor for NonEmptyAddress {
    fn post_process(&self, value: Value, _path: &str) -> Result<Value, PostProcessError> {
        let empty = value
            .get("address")
            .and_then(Value::as_str)
            .is_some_and(str::is_empty);
        if empty {
            Err(PostProcessError::new("address must not be empty"))
        } else {
            Ok(value)
        }
    }
}

/// Pipeline-style schema exercising every node kind.
fn pipeline_graph() -> (TypeGraph, TypeKey) {
    let mut builder = GraphBuilder::new();
    let string = builder.scalar(ScalarKind::String);
    let int = builder.scalar(ScalarKind::Int);
    let bool_kind = builder.scalar(ScalarKind::Bool);

    let local = builder.shape(vec![Field::with_default("workers", int.clone(), json!(4))]);
    let remote = builder.shape(vec![
        Field::required("address", string.clone()),
        Field::with_default("secure", bool_kind, json!(true)),
    ]);
    builder.post_process(&remote, Arc::new(NonEmptyAddress));
    let executor = builder.selector(vec![
        Field::required("local", local),
        Field::required("remote", remote),
    ]);

    let retries = builder.nullable(int.clone());
    let tags = builder.array(string.clone());
    let env = builder.map(ScalarKind::String, string.clone());

    let root = builder.shape(vec![
        Field::required("name", string.clone()),
        Field::with_producer("run_id", string, Arc::new(GeneratedRunId)),
        Field::with_default(
            "executor",
            executor,
            json!({"local": {}}),
        ),
        Field::optional("retries", retries),
        Field::with_default("tags", tags, json!([])),
        Field::with_default("env", env, json!({})),
    ]);
    (builder.finish(), root)
}

fn pipeline_snapshot() -> Result<(SchemaSnapshot, TypeGraph, TypeKey), Box<dyn Error>> {
    let (graph, root) = pipeline_graph();
    let snapshot = SchemaSnapshot::from_graph(&graph, &root)?;
    Ok((snapshot, graph, root))
}

#[test]
fn valid_value_validates_cleanly() -> Result<(), Box<dyn Error>> {
    let (snapshot, _, _) = pipeline_snapshot()?;
    let value = json!({
        "name": "nightly",
        "executor": {"remote": {"address": "10.0.0.1:9000"}},
        "retries": 3,
        "tags": ["etl", "batch"],
        "env": {"REGION": "us-east-1"}
    });

    let errors = validate_value(&snapshot, &value, EvaluationOptions::default())?;
    assert!(errors.is_empty(), "unexpected findings: {errors:?}");
    Ok(())
}

#[test]
fn defaults_fill_recursively_from_literals_and_producers() -> Result<(), Box<dyn Error>> {
    let (_, graph, root) = pipeline_snapshot()?;
    let outcome = resolve_defaults(
        &graph,
        &root,
        &json!({"name": "nightly"}),
        EvaluationOptions::default(),
    )?;

    assert!(outcome.is_success());
    // The executor default selects the local branch, and the nested
    // workers default fills inside it.
    assert_eq!(
        outcome.value,
        Some(json!({
            "name": "nightly",
            "run_id": "run-0000",
            "executor": {"local": {"workers": 4}},
            "tags": [],
            "env": {}
        }))
    );
    Ok(())
}

#[test]
fn resolution_is_idempotent() -> Result<(), Box<dyn Error>> {
    let (_, graph, root) = pipeline_snapshot()?;
    let first = resolve_defaults(
        &graph,
        &root,
        &json!({"name": "nightly", "executor": {"remote": {"address": "a:1"}}}),
        EvaluationOptions::default(),
    )?;
    let resolved = first.value.ok_or("first resolution produced no value")?;

    let second = resolve_defaults(&graph, &root, &resolved, EvaluationOptions::default())?;
    assert!(second.errors.is_empty());
    assert_eq!(second.value, Some(resolved));
    Ok(())
}

#[test]
fn identical_inputs_resolve_identically() -> Result<(), Box<dyn Error>> {
    let (_, graph, root) = pipeline_snapshot()?;
    let value = json!({"name": "nightly", "tags": ["a"], "env": {"K": "v"}});

    let first = resolve_defaults(&graph, &root, &value, EvaluationOptions::default())?;
    let second = resolve_defaults(&graph, &root, &value, EvaluationOptions::default())?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn missing_required_and_unknown_fields_report_exact_paths() -> Result<(), Box<dyn Error>> {
    let (snapshot, _, _) = pipeline_snapshot()?;
    let value = json!({"unknown_knob": 1});

    let errors = validate_value(&snapshot, &value, EvaluationOptions::default())?;
    let missing = errors
        .iter()
        .find(|error| error.kind == EvaluationErrorKind::MissingRequiredField)
        .ok_or("no missing-required finding")?;
    let unknown = errors
        .iter()
        .find(|error| error.kind == EvaluationErrorKind::UnknownField)
        .ok_or("no unknown-field finding")?;

    assert_eq!(missing.path(), "root.name");
    assert_eq!(unknown.path(), "root.unknown_knob");
    assert_eq!(errors.len(), 2);
    Ok(())
}

#[test]
fn nullable_accepts_null_and_checks_inner_otherwise() -> Result<(), Box<dyn Error>> {
    let (snapshot, _, _) = pipeline_snapshot()?;

    let with_null = json!({"name": "n", "retries": null});
    assert!(validate_value(&snapshot, &with_null, EvaluationOptions::default())?.is_empty());

    let with_bad_inner = json!({"name": "n", "retries": "three"});
    let errors = validate_value(&snapshot, &with_bad_inner, EvaluationOptions::default())?;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, EvaluationErrorKind::TypeMismatch);
    // The nullable wrapper is transparent in the reported path.
    assert_eq!(errors[0].path(), "root.retries");
    Ok(())
}

#[test]
fn selector_requires_exactly_one_declared_branch() -> Result<(), Box<dyn Error>> {
    let (snapshot, _, _) = pipeline_snapshot()?;

    for bad_executor in [
        json!({}),
        json!({"local": {}, "remote": {"address": "a:1"}}),
        json!({"kubernetes": {}}),
    ] {
        let value = json!({"name": "n", "executor": bad_executor});
        let errors = validate_value(&snapshot, &value, EvaluationOptions::default())?;
        assert_eq!(errors.len(), 1, "executor: {value}");
        assert_eq!(errors[0].kind, EvaluationErrorKind::AmbiguousOrMissingSelection);
        assert_eq!(errors[0].path(), "root.executor");
    }

    let good = json!({"name": "n", "executor": {"local": {"workers": 2}}});
    assert!(validate_value(&snapshot, &good, EvaluationOptions::default())?.is_empty());
    Ok(())
}

#[test]
fn array_findings_carry_the_failing_index() -> Result<(), Box<dyn Error>> {
    let (snapshot, _, _) = pipeline_snapshot()?;
    let value = json!({"name": "n", "tags": ["ok", 5, "ok"]});

    let errors = validate_value(&snapshot, &value, EvaluationOptions::default())?;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path(), "root.tags[1]");
    Ok(())
}

#[test]
fn map_value_findings_use_the_key_as_path_segment() -> Result<(), Box<dyn Error>> {
    let (snapshot, graph, root) = pipeline_snapshot()?;
    let value = json!({"name": "n", "env": {"REGION": 7}});

    let errors = validate_value(&snapshot, &value, EvaluationOptions::default())?;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, EvaluationErrorKind::TypeMismatch);
    assert_eq!(errors[0].path(), "root.env.REGION");

    let outcome = resolve_defaults(&graph, &root, &value, EvaluationOptions::default())?;
    assert_eq!(outcome.errors, errors);
    // The failing entry is dropped; the map itself survives.
    let resolved = outcome.value.ok_or("no resolved value")?;
    assert_eq!(resolved.get("env"), Some(&json!({})));
    Ok(())
}

#[test]
fn invalid_map_keys_do_not_hide_value_findings() -> Result<(), Box<dyn Error>> {
    let mut builder = GraphBuilder::new();
    let string = builder.scalar(ScalarKind::String);
    let by_port = builder.map(ScalarKind::Int, string);
    let graph = builder.finish();
    let snapshot = SchemaSnapshot::from_graph(&graph, &by_port)?;

    let value = json!({"8080": "web", "admin": 3});
    let errors = validate_value(&snapshot, &value, EvaluationOptions::default())?;

    let kinds: Vec<EvaluationErrorKind> = errors.iter().map(|error| error.kind).collect();
    assert_eq!(errors.len(), 2);
    assert!(kinds.contains(&EvaluationErrorKind::InvalidMapKey));
    assert!(kinds.contains(&EvaluationErrorKind::TypeMismatch));
    let mismatch = errors
        .iter()
        .find(|error| error.kind == EvaluationErrorKind::TypeMismatch)
        .ok_or("no type-mismatch finding")?;
    assert_eq!(mismatch.path(), "root.admin");
    Ok(())
}

#[test]
fn entries_under_invalid_keys_stay_out_of_the_output() -> Result<(), Box<dyn Error>> {
    let mut builder = GraphBuilder::new();
    let string = builder.scalar(ScalarKind::String);
    let by_port = builder.map(ScalarKind::Int, string);
    let graph = builder.finish();

    let value = json!({"8080": "web", "admin": "ui"});
    let outcome = resolve_defaults(&graph, &by_port, &value, EvaluationOptions::default())?;

    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, EvaluationErrorKind::InvalidMapKey);
    assert_eq!(outcome.value, Some(json!({"8080": "web"})));
    Ok(())
}

#[test]
fn post_processing_failures_are_captured_not_fatal() -> Result<(), Box<dyn Error>> {
    let (_, graph, root) = pipeline_snapshot()?;
    let value = json!({
        "name": "nightly",
        "executor": {"remote": {"address": ""}}
    });

    let outcome = resolve_and_postprocess(&graph, &root, &value, EvaluationOptions::default())?;
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, EvaluationErrorKind::PostProcessingFailure);
    assert_eq!(outcome.errors[0].path(), "root.executor.remote");

    // Sibling resolution still completed.
    let resolved = outcome.value.ok_or("root resolution dropped")?;
    assert_eq!(resolved.get("name"), Some(&json!("nightly")));
    Ok(())
}

#[test]
fn permissive_policy_allows_undeclared_keys() -> Result<(), Box<dyn Error>> {
    let (snapshot, graph, root) = pipeline_snapshot()?;
    let value = json!({"name": "n", "legacy_knob": true});

    assert!(validate_value(&snapshot, &value, EvaluationOptions::permissive())?.is_empty());

    // Undeclared keys are skipped, never copied into the resolved tree.
    let outcome = resolve_defaults(&graph, &root, &value, EvaluationOptions::permissive())?;
    assert!(outcome.is_success());
    let resolved = outcome.value.ok_or("no resolved value")?;
    assert_eq!(resolved.get("legacy_knob"), None);
    Ok(())
}

#[test]
fn validate_mode_matches_snapshot_validation() -> Result<(), Box<dyn Error>> {
    let (snapshot, graph, root) = pipeline_snapshot()?;
    let value = json!({"name": 12, "tags": "not-a-list"});

    let direct = validate_value(&snapshot, &value, EvaluationOptions::default())?;
    let via_evaluate = evaluate(
        &graph,
        &root,
        &value,
        TraversalMode::Validate,
        EvaluationOptions::default(),
    )?;

    assert_eq!(via_evaluate.value, None);
    assert_eq!(via_evaluate.errors, direct);
    Ok(())
}
