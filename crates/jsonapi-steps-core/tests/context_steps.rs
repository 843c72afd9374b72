// crates/jsonapi-steps-core/tests/context_steps.rs
// ============================================================================
// Module: Context Step Tests
// Description: Behavior of the response assertion helper operations.
// Purpose: Validate node checks, schema validation, fixtures, and auditing.
// ============================================================================

//! ## Overview
//! Exercises [`JsonApiContext`] against recorded responses and the in-memory
//! fixture gateway:
//! - Construction fails fast when the schema file is missing
//! - Node checks pass and fail on the documented values
//! - Path errors propagate unchanged
//! - Fixture steps persist and flush
//! - Every operation produces an audit event

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use jsonapi_steps_core::ConfigurationError;
use jsonapi_steps_core::DUMMY_FRIEND_NAME;
use jsonapi_steps_core::FixtureKind;
use jsonapi_steps_core::InMemoryFixtureGateway;
use jsonapi_steps_core::JsonApiContext;
use jsonapi_steps_core::MemoryAuditSink;
use jsonapi_steps_core::NodePathError;
use jsonapi_steps_core::RELATED_DUMMY_NAME;
use jsonapi_steps_core::RecordedResponses;
use jsonapi_steps_core::ResponseError;
use jsonapi_steps_core::StepError;
use jsonapi_steps_core::StepOutcome;
use jsonapi_steps_core::StepParseError;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

type TestContext = JsonApiContext<RecordedResponses, InMemoryFixtureGateway>;

fn write_schema(dir: &TempDir) -> PathBuf {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-06/schema#",
        "type": "object",
        "required": ["data"],
        "properties": {
            "data": { "$ref": "#/definitions/resource" }
        },
        "definitions": {
            "resource": {
                "type": "object",
                "required": ["type", "id"],
                "properties": {
                    "type": { "type": "string" },
                    "id": { "type": "string" }
                }
            }
        }
    });
    let path = dir.path().join("jsonapi.json");
    fs::write(&path, serde_json::to_vec_pretty(&schema).unwrap()).unwrap();
    path
}

fn context_with_body(body: &str) -> (TempDir, TestContext) {
    let dir = TempDir::new().unwrap();
    let path = write_schema(&dir);
    let context =
        JsonApiContext::new(&path, RecordedResponses::with_body(body), InMemoryFixtureGateway::new())
            .unwrap();
    (dir, context)
}

// ============================================================================
// SECTION: Construction
// ============================================================================

#[test]
fn missing_schema_fails_at_construction() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.json");
    let err = TestContext::new(&path, RecordedResponses::new(), InMemoryFixtureGateway::new())
        .unwrap_err();
    match err {
        ConfigurationError::MissingSchema(message) => assert!(message.contains("missing.json")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_json_schema_fails_at_construction() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();
    let err = TestContext::new(&path, RecordedResponses::new(), InMemoryFixtureGateway::new())
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidSchema { .. }));
}

// ============================================================================
// SECTION: Node Checks
// ============================================================================

#[test]
fn empty_array_check_accepts_only_empty_arrays() {
    let (_dir, context) =
        context_with_body(r#"{"data":{"relationships":[],"tags":["x"],"meta":{}}}"#);
    context.assert_node_is_empty_array("data.relationships").unwrap();

    let err = context.assert_node_is_empty_array("data.tags").unwrap_err();
    match err {
        StepError::Assertion(assertion) => {
            assert_eq!(assertion.node, "data.tags");
            assert_eq!(assertion.actual, r#"["x"]"#);
            assert!(assertion.to_string().contains(r#"["x"]"#));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = context.assert_node_is_empty_array("data.meta").unwrap_err();
    assert!(err.to_string().contains("{}"));
}

#[test]
fn number_check_accepts_numbers_and_numeric_strings() {
    let (_dir, context) = context_with_body(
        r#"{"data":{"id":"1","count":42,"ratio":0.5,"exp":"1e3","name":"abc","flag":true}}"#,
    );
    context.assert_node_is_number("data.id").unwrap();
    context.assert_node_is_number("data.count").unwrap();
    context.assert_node_is_number("data.ratio").unwrap();
    context.assert_node_is_number("data.exp").unwrap();

    let err = context.assert_node_is_number("data.name").unwrap_err();
    assert!(err.to_string().contains(r#""abc""#), "{err}");
    let err = context.assert_node_is_number("data.flag").unwrap_err();
    assert!(err.to_string().contains("true"), "{err}");
}

#[test]
fn empty_array_and_number_checks_reject_null_and_lookalikes() {
    let (_dir, context) = context_with_body(r#"{"data":{"none":null,"text":"[]","list":[]}}"#);

    let err = context.assert_node_is_empty_array("data.none").unwrap_err();
    match err {
        StepError::Assertion(assertion) => assert_eq!(assertion.actual, "null"),
        other => panic!("unexpected error: {other:?}"),
    }
    let err = context.assert_node_is_empty_array("data.text").unwrap_err();
    match err {
        StepError::Assertion(assertion) => assert_eq!(assertion.actual, r#""[]""#),
        other => panic!("unexpected error: {other:?}"),
    }

    let err = context.assert_node_is_number("data.none").unwrap_err();
    match err {
        StepError::Assertion(assertion) => assert_eq!(assertion.actual, "null"),
        other => panic!("unexpected error: {other:?}"),
    }
    let err = context.assert_node_is_number("data.list").unwrap_err();
    match err {
        StepError::Assertion(assertion) => assert_eq!(assertion.actual, "[]"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_empty_string_check_fails_only_on_empty_string() {
    let (_dir, context) =
        context_with_body(r#"{"data":{"name":"x","blank":"","zero":0,"none":null,"list":[]}}"#);
    context.assert_node_is_non_empty_string("data.name").unwrap();
    context.assert_node_is_non_empty_string("data.zero").unwrap();
    context.assert_node_is_non_empty_string("data.none").unwrap();
    context.assert_node_is_non_empty_string("data.list").unwrap();

    let err = context.assert_node_is_non_empty_string("data.blank").unwrap_err();
    match err {
        StepError::Assertion(assertion) => assert_eq!(assertion.actual, r#""""#),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn checks_address_array_elements() {
    let (_dir, context) = context_with_body(r#"{"data":[{"id":"7","children":[]}]}"#);
    context.assert_node_is_number("data[0].id").unwrap();
    context.assert_node_is_empty_array("data[0].children").unwrap();
    context.assert_node_is_number("data.0.id").unwrap();
}

#[test]
fn missing_nodes_propagate_path_errors() {
    let (_dir, context) = context_with_body(r#"{"data":{"id":"1"}}"#);
    let err = context.assert_node_is_number("data.missing").unwrap_err();
    assert_eq!(err, StepError::NodePath(NodePathError::NotFound("data.missing".to_string())));

    let err = context.assert_node_is_empty_array("data..id").unwrap_err();
    assert!(matches!(err, StepError::NodePath(NodePathError::Syntax { .. })));
}

#[test]
fn checks_require_a_json_response() {
    let dir = TempDir::new().unwrap();
    let path = write_schema(&dir);
    let context =
        TestContext::new(&path, RecordedResponses::new(), InMemoryFixtureGateway::new()).unwrap();
    let err = context.assert_node_is_number("data.id").unwrap_err();
    assert_eq!(err, StepError::Response(ResponseError::NoResponse));

    let (_dir, context) = context_with_body("<html></html>");
    let err = context.assert_node_is_number("data.id").unwrap_err();
    assert!(matches!(err, StepError::Response(ResponseError::InvalidJson(_))));
}

// ============================================================================
// SECTION: Schema Validation
// ============================================================================

#[test]
fn schema_validation_passes_for_conforming_documents() {
    let (_dir, context) = context_with_body(r#"{"data":{"type":"dummies","id":"1"}}"#);
    context.validate_against_schema().unwrap();
}

#[test]
fn schema_validation_reports_every_violation() {
    let (_dir, context) = context_with_body(r#"{"data":{"type":5,"id":7}}"#);
    let err = context.validate_against_schema().unwrap_err();
    match err {
        StepError::SchemaValidation(validation) => {
            assert_eq!(validation.violations.len(), 2, "{:?}", validation.violations);
            let message = validation.to_string();
            assert!(message.starts_with("the JSON is not valid according to the schema"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn schema_validation_rereads_the_current_response() {
    let (_dir, mut context) = context_with_body(r#"{"data":{"type":"dummies","id":"1"}}"#);
    context.validate_against_schema().unwrap();
    context
        .responses_mut()
        .record(jsonapi_steps_core::ResponseSnapshot::from_body(r#"{"errors":[]}"#));
    assert!(matches!(context.validate_against_schema(), Err(StepError::SchemaValidation(_))));
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[test]
fn fixture_steps_persist_and_flush() {
    let (_dir, mut context) = context_with_body("{}");
    let report = context.create_fixture(FixtureKind::RelatedDummy).unwrap();
    assert_eq!(report.ids(FixtureKind::RelatedDummy), vec![1]);
    context.create_fixture(FixtureKind::DummyFriend).unwrap();

    let gateway = context.gateway();
    assert_eq!(gateway.flushes(), 2);
    assert_eq!(gateway.pending(), 0);
    assert_eq!(gateway.related_dummies()[0].1.name, RELATED_DUMMY_NAME);
    assert_eq!(gateway.dummy_friends()[0].1.name, DUMMY_FRIEND_NAME);
}

#[test]
fn circular_reference_fixture_links_both_nodes() {
    let (_dir, mut context) = context_with_body("{}");
    let report = context.create_fixture(FixtureKind::CircularReference).unwrap();
    let ids = report.ids(FixtureKind::CircularReference);
    assert_eq!(ids.len(), 2);
    let (first, second) = (ids[0], ids[1]);

    let rows = context.gateway().circular_references();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, first);
    assert_eq!(rows[0].parent_id, Some(first));
    assert_eq!(rows[0].children, vec![first, second]);
    assert_eq!(rows[1].id, second);
    assert_eq!(rows[1].parent_id, Some(first));
    assert!(rows[1].children.is_empty());
}

#[test]
fn repeated_fixture_steps_create_distinct_records() {
    let (_dir, mut context) = context_with_body("{}");
    context.create_fixture(FixtureKind::CircularReference).unwrap();
    context.create_fixture(FixtureKind::CircularReference).unwrap();
    let rows = context.gateway().circular_references();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[2].parent_id, Some(rows[2].id));
}

// ============================================================================
// SECTION: Step Dispatch
// ============================================================================

#[test]
fn run_step_dispatches_phrases() {
    let (_dir, mut context) =
        context_with_body(r#"{"data":{"type":"dummies","id":"3","related":[]}}"#);
    context.run_step("Then the JSON should be valid according to the JSON API schema").unwrap();
    context.run_step("And the JSON node \"data.related\" should be an empty array").unwrap();
    context.run_step("And the JSON node \"data.id\" should be a number").unwrap();
    context.run_step("And the JSON node \"data.type\" should not be an empty string").unwrap();
    context.run_step("Given there is a DummyFriend").unwrap();
    assert_eq!(context.gateway().dummy_friends().len(), 1);

    let err = context.run_step("Then the JSON node \"data\" should be green").unwrap_err();
    assert!(matches!(err, StepError::Parse(StepParseError::UnknownStep(_))));
}

// ============================================================================
// SECTION: Auditing
// ============================================================================

#[test]
fn every_operation_is_audited() {
    let sink = Arc::new(MemoryAuditSink::new());
    let (_dir, context) = context_with_body(r#"{"data":{"type":"dummies","id":""}}"#);
    let mut context = context.with_audit_sink(sink.clone());

    context.validate_against_schema().unwrap();
    context.assert_node_is_non_empty_string("data.id").unwrap_err();
    context.create_fixture(FixtureKind::RelatedDummy).unwrap();
    context.run_step("Then the JSON node data.type should be an empty array").unwrap_err();
    context.run_step("Then the JSON node data.id should be a number").unwrap_err();

    let events = sink.events();
    assert_eq!(events.len(), 5);
    assert_eq!(events[0].step, "validate_against_schema");
    assert_eq!(events[0].outcome, StepOutcome::Passed);
    assert_eq!(events[1].step, "assert_node_is_non_empty_string");
    assert_eq!(events[1].node.as_deref(), Some("data.id"));
    assert_eq!(events[1].outcome, StepOutcome::Failed);
    assert!(events[1].error.as_deref().unwrap().contains(r#""""#));
    assert_eq!(events[2].step, "create_fixture");
    assert_eq!(events[2].fixture, Some(FixtureKind::RelatedDummy));
    assert_eq!(events[2].node, None);
    assert_eq!(events[3].step, "assert_node_is_empty_array");
    assert_eq!(events[3].node.as_deref(), Some("data.type"));
    assert_eq!(events[4].step, "assert_node_is_number");
    assert_eq!(events[4].fixture, None);
}
