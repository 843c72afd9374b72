// crates/jsonapi-steps-core/src/lib.rs
// ============================================================================
// Module: JSON API Steps Core
// Description: Response assertion helper and step bindings for BDD suites.
// Purpose: Bridge scenario phrases to JSON response checks and fixture setup.
// Dependencies: jsonpath_lib, jsonschema, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! JSON API Steps Core provides [`JsonApiContext`], the response assertion
//! helper consumed by scenario-step dispatchers. The helper reads the last
//! HTTP response body from a [`ResponseSource`], evaluates [`NodePath`]
//! expressions or validates against a [`SchemaDocument`], and creates fixture
//! data through an injected [`FixtureGateway`].
//! Invariants:
//! - The schema file is loaded at construction; a missing file fails fast.
//! - Every assertion failure embeds the observed value, JSON-encoded.
//! - Path evaluation errors propagate unchanged through [`StepError`].
//! - Fixture creation flushes the unit of work before returning.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod context;
pub mod fixtures;
pub mod node_path;
pub mod numeric;
pub mod response;
pub mod schema;
pub mod steps;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::StepAuditEvent;
pub use audit::StepAuditSink;
pub use audit::StepOutcome;
pub use context::AssertionError;
pub use context::JsonApiContext;
pub use context::StepError;
pub use fixtures::CircularReferenceNode;
pub use fixtures::DUMMY_FRIEND_NAME;
pub use fixtures::DummyFriend;
pub use fixtures::EntityKey;
pub use fixtures::FixtureEntity;
pub use fixtures::FixtureError;
pub use fixtures::FixtureGateway;
pub use fixtures::FixtureGraph;
pub use fixtures::FixtureKind;
pub use fixtures::FlushReport;
pub use fixtures::InMemoryFixtureGateway;
pub use fixtures::PersistedEntity;
pub use fixtures::RELATED_DUMMY_NAME;
pub use fixtures::RelatedDummy;
pub use fixtures::StoredCircularReference;
pub use node_path::NodePath;
pub use node_path::NodePathError;
pub use node_path::PathSegment;
pub use response::RecordedResponses;
pub use response::ResponseError;
pub use response::ResponseSnapshot;
pub use response::ResponseSource;
pub use schema::CompiledSchema;
pub use schema::ConfigurationError;
pub use schema::DEFAULT_MAX_REF_DEPTH;
pub use schema::SchemaDocument;
pub use schema::SchemaError;
pub use schema::SchemaValidationError;
pub use steps::Step;
pub use steps::StepDefinition;
pub use steps::StepKeyword;
pub use steps::StepParseError;
pub use steps::parse_step;
pub use steps::step_definitions;
