// crates/jsonapi-steps-core/src/audit.rs
// ============================================================================
// Module: Step Audit Logging
// Description: Structured audit events for executed scenario steps.
// Purpose: Emit JSON-line step records without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every assertion and fixture operation of the helper produces a
//! [`StepAuditEvent`]. Events go to a [`StepAuditSink`]; suites choose stderr,
//! an append-only file, memory, or nothing. Recording never fails a step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::fixtures::FixtureKind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Step outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step passed.
    Passed,
    /// The step failed.
    Failed,
}

/// Audit record for one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation label.
    pub step: &'static str,
    /// Node path argument, when the step takes one.
    pub node: Option<String>,
    /// Fixture kind, for fixture steps.
    pub fixture: Option<FixtureKind>,
    /// Step outcome.
    pub outcome: StepOutcome,
    /// Failure message for failed steps.
    pub error: Option<String>,
}

impl StepAuditEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        step: &'static str,
        node: Option<String>,
        fixture: Option<FixtureKind>,
        error: Option<String>,
    ) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        let outcome = if error.is_some() { StepOutcome::Failed } else { StepOutcome::Passed };
        Self {
            event: "jsonapi_step",
            timestamp_ms,
            step,
            node,
            fixture,
            outcome,
            error,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for step audit events.
pub trait StepAuditSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: &StepAuditEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl StepAuditSink for NoopAuditSink {
    fn record(&self, _event: &StepAuditEvent) {}
}

/// Sink that writes JSON lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAuditSink;

impl StepAuditSink for StderrAuditSink {
    fn record(&self, event: &StepAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl StepAuditSink for FileAuditSink {
    fn record(&self, event: &StepAuditEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut guard) = self.file.lock() {
            let _ = writeln!(guard, "{payload}");
        }
    }
}

/// Sink that keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    /// Recorded events in order.
    events: Mutex<Vec<StepAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<StepAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl StepAuditSink for MemoryAuditSink {
    fn record(&self, event: &StepAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
