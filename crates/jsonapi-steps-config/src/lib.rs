// crates/jsonapi-steps-config/src/lib.rs
// ============================================================================
// Module: JSON API Steps Config Library
// Description: Suite configuration model, validation, and context assembly.
// Purpose: Single source of truth for jsonapi-steps.toml semantics.
// Dependencies: jsonapi-steps-core, jsonapi-steps-http, jsonapi-steps-store-sqlite, toml
// ============================================================================

//! ## Overview
//! `jsonapi-steps-config` loads `jsonapi-steps.toml`, validates it fail-closed,
//! and assembles a ready [`JsonApiContext`] from it: schema document, HTTP
//! driver, fixture gateway, and audit sink.
//!
//! [`JsonApiContext`]: jsonapi_steps_core::JsonApiContext

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assembly;
pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assembly::ConfiguredContext;
pub use assembly::ConfiguredGateway;
pub use config::*;
pub use examples::config_toml_example;
