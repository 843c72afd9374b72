// crates/jsonapi-steps-core/src/context.rs
// ============================================================================
// Module: JSON API Context
// Description: Response assertion helper bound to scenario steps.
// Purpose: Check the last JSON response and create fixtures for scenarios.
// Dependencies: serde_json, thiserror, crate modules
// ============================================================================

//! ## Overview
//! [`JsonApiContext`] owns the loaded schema, a [`ResponseSource`] for the
//! last HTTP response, and an injected [`FixtureGateway`]. Each check reads
//! the current response body; every failure message embeds the observed
//! value, JSON-encoded. Node path errors are returned unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::audit::NoopAuditSink;
use crate::audit::StepAuditEvent;
use crate::audit::StepAuditSink;
use crate::fixtures::FixtureEntity;
use crate::fixtures::FixtureError;
use crate::fixtures::FixtureGateway;
use crate::fixtures::FixtureKind;
use crate::fixtures::FlushReport;
use crate::node_path::NodePath;
use crate::node_path::NodePathError;
use crate::numeric::is_numeric;
use crate::response::ResponseError;
use crate::response::ResponseSource;
use crate::schema::ConfigurationError;
use crate::schema::SchemaDocument;
use crate::schema::SchemaError;
use crate::schema::SchemaValidationError;
use crate::steps::Step;
use crate::steps::StepParseError;
use crate::steps::parse_step;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failed node check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("the JSON node `{node}` {expectation}: the node value is `{actual}`")]
pub struct AssertionError {
    /// Node path as written in the step.
    pub node: String,
    /// Expected property, phrased as in the step.
    pub expectation: &'static str,
    /// Observed value, JSON-encoded.
    pub actual: String,
}

/// Errors returned by step operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    /// Helper configuration failed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// A node check failed.
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    /// The response does not satisfy the schema.
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),
    /// The schema could not be resolved or compiled.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Node path evaluator error, unchanged.
    #[error(transparent)]
    NodePath(#[from] NodePathError),
    /// The last response is missing or not JSON.
    #[error(transparent)]
    Response(#[from] ResponseError),
    /// Fixture persistence failed.
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    /// The step phrase is unknown.
    #[error(transparent)]
    Parse(#[from] StepParseError),
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Response assertion helper for JSON API scenarios.
pub struct JsonApiContext<R, G> {
    /// Loaded JSON API schema.
    schema: SchemaDocument,
    /// Last-response accessor of the HTTP test driver.
    responses: R,
    /// Fixture persistence gateway.
    gateway: G,
    /// Step audit sink.
    audit: Arc<dyn StepAuditSink>,
}

impl<R: fmt::Debug, G: fmt::Debug> fmt::Debug for JsonApiContext<R, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonApiContext")
            .field("schema", &self.schema.path())
            .field("responses", &self.responses)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

impl<R, G> JsonApiContext<R, G>
where
    R: ResponseSource,
    G: FixtureGateway,
{
    /// Builds a context, loading the schema file immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the schema file is missing or
    /// unreadable.
    pub fn new(
        schema_path: impl AsRef<Path>,
        responses: R,
        gateway: G,
    ) -> Result<Self, ConfigurationError> {
        let schema = SchemaDocument::load(schema_path)?;
        Ok(Self::from_schema(schema, responses, gateway))
    }

    /// Builds a context around an already loaded schema.
    #[must_use]
    pub fn from_schema(schema: SchemaDocument, responses: R, gateway: G) -> Self {
        Self {
            schema,
            responses,
            gateway,
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn StepAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the loaded schema.
    #[must_use]
    pub const fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    /// Returns the response source.
    #[must_use]
    pub const fn responses(&self) -> &R {
        &self.responses
    }

    /// Returns the response source for issuing requests.
    pub const fn responses_mut(&mut self) -> &mut R {
        &mut self.responses
    }

    /// Returns the fixture gateway.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the fixture gateway mutably.
    pub const fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Validates the last response against the schema, reporting every
    /// violation.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::SchemaValidation`] when the document is invalid,
    /// or a response/schema error when validation cannot run.
    pub fn validate_against_schema(&self) -> Result<(), StepError> {
        let result = self.check_schema();
        self.audited(&Step::JsonIsValid, result)
    }

    /// Fails unless the node is an array with no elements.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when the check fails.
    pub fn assert_node_is_empty_array(&self, node: &str) -> Result<(), StepError> {
        let result = self.check_node(node, "should be an empty array", |value| {
            value.as_array().is_some_and(Vec::is_empty)
        });
        self.audited(&Step::NodeIsEmptyArray(node.to_string()), result)
    }

    /// Fails unless the node is a number or a numeric string.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when the check fails.
    pub fn assert_node_is_number(&self, node: &str) -> Result<(), StepError> {
        let result = self.check_node(node, "should be a number", is_numeric);
        self.audited(&Step::NodeIsNumber(node.to_string()), result)
    }

    /// Fails only when the node is exactly the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when the node is `""`.
    pub fn assert_node_is_non_empty_string(&self, node: &str) -> Result<(), StepError> {
        let result = self.check_node(node, "should not be an empty string", |value| {
            value.as_str() != Some("")
        });
        self.audited(&Step::NodeIsNotEmptyString(node.to_string()), result)
    }

    /// Creates, persists, and flushes one fixture.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Fixture`] when persistence fails.
    pub fn create_fixture(&mut self, kind: FixtureKind) -> Result<FlushReport, StepError> {
        let result = self.persist_fixture(kind);
        self.audited(&Step::ThereIs(kind), result)
    }

    /// Parses and executes a step line.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Parse`] for unknown phrases, or the step's error.
    pub fn run_step(&mut self, text: &str) -> Result<(), StepError> {
        let step = parse_step(text)?;
        self.execute(&step)
    }

    /// Executes a parsed step.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying operation.
    pub fn execute(&mut self, step: &Step) -> Result<(), StepError> {
        match step {
            Step::JsonIsValid => self.validate_against_schema(),
            Step::NodeIsEmptyArray(node) => self.assert_node_is_empty_array(node),
            Step::NodeIsNumber(node) => self.assert_node_is_number(node),
            Step::NodeIsNotEmptyString(node) => self.assert_node_is_non_empty_string(node),
            Step::ThereIs(kind) => self.create_fixture(*kind).map(|_| ()),
        }
    }

    /// Parses the last response body.
    fn document(&self) -> Result<Value, StepError> {
        Ok(self.responses.last_response()?.json()?)
    }

    /// Compiles the schema and validates the last response.
    fn check_schema(&self) -> Result<(), StepError> {
        let document = self.document()?;
        let compiled = self.schema.compile()?;
        compiled.validate(&document)?;
        Ok(())
    }

    /// Evaluates `node` and applies `check` to the resolved value.
    fn check_node(
        &self,
        node: &str,
        expectation: &'static str,
        check: impl Fn(&Value) -> bool,
    ) -> Result<(), StepError> {
        let path = NodePath::parse(node)?;
        let document = self.document()?;
        let actual = path.evaluate(&document)?;
        if check(actual) {
            return Ok(());
        }
        Err(AssertionError {
            node: node.to_string(),
            expectation,
            actual: actual.to_string(),
        }
        .into())
    }

    /// Builds the fixture entity and flushes it.
    fn persist_fixture(&mut self, kind: FixtureKind) -> Result<FlushReport, StepError> {
        self.gateway.persist(FixtureEntity::for_kind(kind))?;
        Ok(self.gateway.flush()?)
    }

    /// Records an audit event for `step` and returns `result` unchanged.
    fn audited<T>(&self, step: &Step, result: Result<T, StepError>) -> Result<T, StepError> {
        let error = result.as_ref().err().map(ToString::to_string);
        let node = step.node().map(str::to_string);
        self.audit.record(&StepAuditEvent::new(step.label(), node, step.fixture(), error));
        result
    }
}
