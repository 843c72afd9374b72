// crates/jsonapi-steps-core/src/response.rs
// ============================================================================
// Module: Response Snapshots
// Description: Last-response accessor contract for HTTP test drivers.
// Purpose: Give the assertion helper read-only access to the last body.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! HTTP test drivers own the last response they received and expose it as a
//! [`ResponseSnapshot`] through [`ResponseSource`]. The assertion helper only
//! reads the body. [`RecordedResponses`] is a driver-free source for unit
//! tests and offline replays.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while reading the last response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// No request has been issued yet.
    #[error("no response has been received yet")]
    NoResponse,
    /// The body is not a JSON document.
    #[error("response body is not valid json: {0}")]
    InvalidJson(String),
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Last HTTP response as seen by the test driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// HTTP status code.
    pub status: u16,
    /// Content type header, when present.
    pub content_type: Option<String>,
    /// Raw response body.
    pub body: String,
}

impl ResponseSnapshot {
    /// Creates a `200` snapshot with the given body and no content type.
    #[must_use]
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::InvalidJson`] when the body does not parse.
    pub fn json(&self) -> Result<Value, ResponseError> {
        serde_json::from_str(&self.body).map_err(|err| ResponseError::InvalidJson(err.to_string()))
    }
}

// ============================================================================
// SECTION: Source Trait
// ============================================================================

/// Read access to the last response of an HTTP test driver.
pub trait ResponseSource {
    /// Returns the last response received.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::NoResponse`] when nothing was received yet.
    fn last_response(&self) -> Result<&ResponseSnapshot, ResponseError>;
}

/// Response source that replays recorded snapshots.
#[derive(Debug, Default, Clone)]
pub struct RecordedResponses {
    /// Most recently recorded snapshot.
    last: Option<ResponseSnapshot>,
}

impl RecordedResponses {
    /// Creates an empty source.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: None,
        }
    }

    /// Creates a source whose last response carries `body`.
    #[must_use]
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            last: Some(ResponseSnapshot::from_body(body)),
        }
    }

    /// Replaces the last response.
    pub fn record(&mut self, snapshot: ResponseSnapshot) {
        self.last = Some(snapshot);
    }
}

impl ResponseSource for RecordedResponses {
    fn last_response(&self) -> Result<&ResponseSnapshot, ResponseError> {
        self.last.as_ref().ok_or(ResponseError::NoResponse)
    }
}
