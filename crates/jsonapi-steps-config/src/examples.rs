// crates/jsonapi-steps-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic starting point for suite configuration files.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical `jsonapi-steps.toml` for a suite that drives a local API and
//! seeds fixtures through `SQLite`. The output parses and validates as-is.

/// Returns a canonical example `jsonapi-steps.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[schema]
path = "features/jsonapi/jsonapi.json"
max_ref_depth = 15

[http]
base_url = "http://127.0.0.1:8080/"
timeout_ms = 5000
max_response_bytes = 1048576

[store]
type = "sqlite"
path = "var/fixtures.sqlite"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[audit]
sink = "stderr"
"#,
    )
}
