// crates/jsonapi-steps-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Fixture Store
// Description: Fixture gateway backend using SQLite.
// Purpose: Persist scenario fixtures where the system under test can read them.
// Dependencies: jsonapi-steps-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`FixtureGateway`] for JSON API
//! scenarios. Entities are queued by `persist` and written in one transaction
//! by `flush`; circular reference graphs are written in two phases so rows can
//! point at themselves and each other.
//!
//! [`FixtureGateway`]: jsonapi_steps_core::FixtureGateway

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteFixtureStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
