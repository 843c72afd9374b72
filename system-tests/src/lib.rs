// system-tests/src/lib.rs
// ============================================================================
// Module: JSON API Steps System Tests Library
// Description: Shared harness pieces for the Gherkin feature suites.
// Purpose: Host the stub JSON API that feature scenarios run against.
// Dependencies: jsonapi-steps-store-sqlite, tiny_http
// ============================================================================

//! ## Overview
//! This crate hosts the stub JSON API used by the feature suites in
//! `system-tests/tests`. The stub reads fixtures from the same `SQLite` file
//! the scenarios seed through `Given there is a ...` steps.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod stub_api;

pub use stub_api::StubApi;
