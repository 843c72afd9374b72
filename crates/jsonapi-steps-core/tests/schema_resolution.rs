// crates/jsonapi-steps-core/tests/schema_resolution.rs
// ============================================================================
// Module: Schema Resolution Tests
// Description: Reference bundling and depth cap behavior for schema files.
// Purpose: Validate local, sibling-file, and recursive `$ref` handling.
// ============================================================================

//! ## Overview
//! Covers [`SchemaDocument`] loading and `$ref` bundling:
//! - Local pointers stay as written and sibling files land in `definitions`
//! - Branching recursive definitions resolve without growing the document
//! - Recursive files are bundled once; long file chains hit the depth cap
//! - Missing targets and oversized files are reported

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use jsonapi_steps_core::ConfigurationError;
use jsonapi_steps_core::DEFAULT_MAX_REF_DEPTH;
use jsonapi_steps_core::SchemaDocument;
use jsonapi_steps_core::SchemaError;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path
}

// ============================================================================
// SECTION: Bundling
// ============================================================================

#[test]
fn bundles_sibling_files_and_keeps_local_references() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "links.json",
        &json!({
            "definitions": {
                "link": { "type": "string" },
                "links": {
                    "type": "object",
                    "additionalProperties": { "$ref": "#/definitions/link" }
                }
            }
        }),
    );
    let root = write_json(
        dir.path(),
        "root.json",
        &json!({
            "type": "object",
            "properties": {
                "data": { "$ref": "#/definitions/resource" },
                "links": { "$ref": "links.json#/definitions/links" }
            },
            "definitions": {
                "resource": { "type": "object", "required": ["id"] }
            }
        }),
    );

    let schema = SchemaDocument::load(&root).unwrap();
    let resolved = schema.resolve().unwrap();
    assert_eq!(resolved.pointer("/properties/data/$ref"), Some(&json!("#/definitions/resource")));
    assert_eq!(
        resolved.pointer("/properties/links/$ref"),
        Some(&json!("#/definitions/links.json/definitions/links"))
    );
    assert_eq!(
        resolved.pointer("/definitions/links.json/definitions/links/additionalProperties/$ref"),
        Some(&json!("#/definitions/links.json/definitions/link"))
    );

    let compiled = schema.compile().unwrap();
    compiled.validate(&json!({ "data": { "id": "1" }, "links": { "self": "/dummies/1" } })).unwrap();
    let err = compiled.validate(&json!({ "data": {}, "links": { "self": 3 } })).unwrap_err();
    assert_eq!(err.violations.len(), 2, "{:?}", err.violations);
}

#[test]
fn nested_file_references_resolve_relative_to_the_referring_file() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("parts");
    fs::create_dir(&nested).unwrap();
    write_json(&nested, "id.json", &json!({ "type": "string", "minLength": 1 }));
    write_json(&nested, "resource.json", &json!({ "properties": { "id": { "$ref": "id.json" } } }));
    let root = write_json(dir.path(), "root.json", &json!({ "$ref": "parts/resource.json" }));

    let schema = SchemaDocument::load(&root).unwrap();
    let resolved = schema.resolve().unwrap();
    assert_eq!(resolved.pointer("/$ref"), Some(&json!("#/definitions/resource.json")));
    assert_eq!(
        resolved.pointer("/definitions/resource.json/properties/id/$ref"),
        Some(&json!("#/definitions/id.json"))
    );
    assert_eq!(resolved.pointer("/definitions/id.json/minLength"), Some(&json!(1)));

    let compiled = schema.compile().unwrap();
    compiled.validate(&json!({ "id": "1" })).unwrap();
    assert!(compiled.validate(&json!({ "id": "" })).is_err());
}

#[test]
fn foreign_uri_references_are_left_for_the_validator() {
    let dir = TempDir::new().unwrap();
    let root = write_json(
        dir.path(),
        "root.json",
        &json!({ "properties": { "meta": { "$ref": "https://example.com/meta.json" } } }),
    );
    let resolved = SchemaDocument::load(&root).unwrap().resolve().unwrap();
    assert_eq!(
        resolved.pointer("/properties/meta/$ref"),
        Some(&json!("https://example.com/meta.json"))
    );
}

// ============================================================================
// SECTION: Recursion and Depth Cap
// ============================================================================

#[test]
fn branching_recursive_definitions_resolve_at_the_default_cap() {
    let dir = TempDir::new().unwrap();
    let document = json!({
        "$ref": "#/definitions/node",
        "definitions": {
            "node": {
                "type": "object",
                "properties": {
                    "a": { "$ref": "#/definitions/node" },
                    "b": { "$ref": "#/definitions/node" },
                    "c": { "$ref": "#/definitions/node" },
                    "d": { "$ref": "#/definitions/node" }
                }
            }
        }
    });
    let root = write_json(dir.path(), "tree.json", &document);

    let schema = SchemaDocument::load(&root).unwrap();
    assert_eq!(schema.max_ref_depth(), DEFAULT_MAX_REF_DEPTH);
    assert_eq!(schema.resolve().unwrap(), document);

    let compiled = schema.compile().unwrap();
    let deep = json!({ "a": { "b": { "c": { "d": { "a": {} } } } }, "d": {} });
    compiled.validate(&deep).unwrap();
    let invalid = json!({ "a": { "b": { "c": { "d": 1 } } } });
    assert!(compiled.validate(&invalid).is_err());
}

#[test]
fn recursive_file_references_are_bundled_once() {
    let dir = TempDir::new().unwrap();
    write_json(
        dir.path(),
        "loop.json",
        &json!({ "type": "object", "properties": { "next": { "$ref": "loop.json" } } }),
    );
    let root = write_json(dir.path(), "root.json", &json!({ "$ref": "loop.json" }));

    let schema = SchemaDocument::load(&root).unwrap();
    let resolved = schema.resolve().unwrap();
    let definitions = resolved["definitions"].as_object().unwrap();
    assert_eq!(definitions.len(), 1);
    assert_eq!(
        resolved.pointer("/definitions/loop.json/properties/next/$ref"),
        Some(&json!("#/definitions/loop.json"))
    );

    let compiled = schema.compile().unwrap();
    compiled.validate(&json!({ "next": { "next": {} } })).unwrap();
    assert!(compiled.validate(&json!({ "next": { "next": 1 } })).is_err());
}

#[test]
fn file_reference_chains_longer_than_the_cap_fail() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "a.json", &json!({ "properties": { "b": { "$ref": "b.json" } } }));
    write_json(dir.path(), "b.json", &json!({ "properties": { "c": { "$ref": "c.json" } } }));
    write_json(dir.path(), "c.json", &json!({ "type": "object" }));
    let root = write_json(dir.path(), "root.json", &json!({ "$ref": "a.json" }));

    let err =
        SchemaDocument::load(&root).unwrap().with_max_ref_depth(2).unwrap().resolve().unwrap_err();
    assert_eq!(
        err,
        SchemaError::ReferenceDepthExceeded {
            reference: "c.json".to_string(),
            max_depth: 2,
        }
    );

    let resolved =
        SchemaDocument::load(&root).unwrap().with_max_ref_depth(3).unwrap().resolve().unwrap();
    assert_eq!(resolved["definitions"].as_object().unwrap().len(), 3);
}

#[test]
fn zero_depth_cap_is_rejected() {
    let dir = TempDir::new().unwrap();
    let root = write_json(dir.path(), "root.json", &json!({}));
    let err = SchemaDocument::load(&root).unwrap().with_max_ref_depth(0).unwrap_err();
    assert_eq!(err, ConfigurationError::InvalidRefDepth);
}

// ============================================================================
// SECTION: Failures
// ============================================================================

#[test]
fn missing_reference_targets_are_reported() {
    let dir = TempDir::new().unwrap();
    let root = write_json(
        dir.path(),
        "root.json",
        &json!({ "properties": { "a": { "$ref": "#/definitions/absent" } } }),
    );
    let err = SchemaDocument::load(&root).unwrap().resolve().unwrap_err();
    assert_eq!(err, SchemaError::UnresolvedReference("#/definitions/absent".to_string()));

    let root = write_json(dir.path(), "other.json", &json!({ "$ref": "absent.json" }));
    let err = SchemaDocument::load(&root).unwrap().resolve().unwrap_err();
    assert!(matches!(err, SchemaError::ReferenceLoad { .. }));

    write_json(dir.path(), "links.json", &json!({ "definitions": {} }));
    let root = write_json(
        dir.path(),
        "pointer.json",
        &json!({ "$ref": "links.json#/definitions/absent" }),
    );
    let err = SchemaDocument::load(&root).unwrap().resolve().unwrap_err();
    assert_eq!(err, SchemaError::UnresolvedReference("links.json#/definitions/absent".to_string()));
}

#[test]
fn oversized_schema_files_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("huge.json");
    let padding = " ".repeat(1024 * 1024);
    fs::write(&path, format!("{{}}{padding}")).unwrap();
    let err = SchemaDocument::load(&path).unwrap_err();
    assert!(matches!(err, ConfigurationError::TooLarge { .. }));
}
