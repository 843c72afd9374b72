// crates/jsonapi-steps-http/src/lib.rs
// ============================================================================
// Module: JSON API Steps HTTP Driver
// Description: Blocking HTTP client for scenario requests.
// Purpose: Send requests to the system under test and keep the last response.
// Dependencies: jsonapi-steps-core, reqwest, url
// ============================================================================

//! ## Overview
//! [`HttpDriver`] sends blocking requests relative to a base URL and records
//! the last response as a [`ResponseSnapshot`]. It implements
//! [`ResponseSource`], so a [`JsonApiContext`] can assert on whatever the
//! scenario requested last.
//!
//! [`ResponseSnapshot`]: jsonapi_steps_core::ResponseSnapshot
//! [`ResponseSource`]: jsonapi_steps_core::ResponseSource
//! [`JsonApiContext`]: jsonapi_steps_core::JsonApiContext

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod driver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use driver::DEFAULT_MAX_RESPONSE_BYTES;
pub use driver::DEFAULT_TIMEOUT_MS;
pub use driver::HttpDriver;
pub use driver::HttpDriverConfig;
pub use driver::HttpDriverError;
pub use reqwest::Method;
