// crates/jsonapi-steps-config/src/config.rs
// ============================================================================
// Module: JSON API Steps Configuration
// Description: Configuration loading and validation for scenario suites.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: jsonapi-steps-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file path comes from the caller, then `JSONAPI_STEPS_CONFIG`, then
//! `jsonapi-steps.toml` in the working directory. Relative paths inside the
//! file are used as written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use jsonapi_steps_store_sqlite::SqliteStoreMode;
use jsonapi_steps_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "jsonapi-steps.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "JSONAPI_STEPS_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Largest accepted schema reference depth.
pub(crate) const MAX_REF_DEPTH_LIMIT: usize = 64;
/// Smallest accepted HTTP timeout in milliseconds.
pub(crate) const MIN_HTTP_TIMEOUT_MS: u64 = 100;
/// Largest accepted HTTP timeout in milliseconds.
pub(crate) const MAX_HTTP_TIMEOUT_MS: u64 = 60_000;
/// Largest accepted HTTP response limit in bytes.
pub(crate) const MAX_HTTP_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Suite configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonApiStepsConfig {
    /// JSON API schema configuration.
    pub schema: SchemaConfig,
    /// HTTP driver configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Fixture store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Step audit configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl JsonApiStepsConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schema.validate()?;
        self.http.validate()?;
        self.store.validate()?;
        self.audit.validate()
    }
}

// ============================================================================
// SECTION: Schema Config
// ============================================================================

/// JSON API schema configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    /// Path to the JSON API schema file.
    pub path: PathBuf,
    /// Maximum chain of `$ref` file references.
    #[serde(default = "default_max_ref_depth")]
    pub max_ref_depth: usize,
}

impl SchemaConfig {
    /// Validates schema configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("schema.path", &self.path.to_string_lossy())?;
        if self.max_ref_depth == 0 || self.max_ref_depth > MAX_REF_DEPTH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "schema.max_ref_depth must be between 1 and {MAX_REF_DEPTH_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Returns the default schema reference depth.
const fn default_max_ref_depth() -> usize {
    jsonapi_steps_core::DEFAULT_MAX_REF_DEPTH
}

// ============================================================================
// SECTION: HTTP Config
// ============================================================================

/// HTTP driver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Base URL of the API under test.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_http_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl HttpConfig {
    /// Validates HTTP configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            let url = Url::parse(base_url)
                .map_err(|err| ConfigError::Invalid(format!("http.base_url invalid: {err}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(
                    "http.base_url must use http or https".to_string(),
                ));
            }
        }
        if !(MIN_HTTP_TIMEOUT_MS..=MAX_HTTP_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "http.timeout_ms must be between {MIN_HTTP_TIMEOUT_MS} and {MAX_HTTP_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_HTTP_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "http.max_response_bytes must be between 1 and {MAX_HTTP_RESPONSE_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Returns the default HTTP timeout.
const fn default_http_timeout_ms() -> u64 {
    jsonapi_steps_http::DEFAULT_TIMEOUT_MS
}

/// Returns the default HTTP response limit.
const fn default_max_response_bytes() -> usize {
    jsonapi_steps_http::DEFAULT_MAX_RESPONSE_BYTES
}

// ============================================================================
// SECTION: Store Config
// ============================================================================

/// Fixture store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-memory gateway; fixtures are not visible to the API under test.
    #[default]
    Memory,
    /// `SQLite` fixture store.
    Sqlite,
}

/// Fixture store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates fixture store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }
}

/// Returns the default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Audit Config
// ============================================================================

/// Step audit sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkType {
    /// Drop audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Step audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: AuditSinkType,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkType::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (AuditSinkType::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or opening configured files.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use std::path::Path;

    use super::MAX_PATH_COMPONENT_LENGTH;
    use super::MAX_TOTAL_PATH_LENGTH;
    use super::resolve_path;
    use super::validate_path_string;

    #[test]
    fn explicit_path_wins_over_defaults() {
        let path = Path::new("suite/jsonapi-steps.toml");
        assert_eq!(resolve_path(Some(path)).unwrap(), path);
    }

    #[test]
    fn validate_path_string_rejects_blank_and_overlong_values() {
        assert!(validate_path_string("schema.path", "   ").is_err());
        let long_path = "a".repeat(MAX_TOTAL_PATH_LENGTH + 1);
        assert!(validate_path_string("schema.path", &long_path).is_err());
        let long_component = format!("./{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        let err = validate_path_string("schema.path", &long_component).unwrap_err();
        assert!(err.to_string().contains("component too long"));
    }

    #[test]
    fn validate_path_string_accepts_component_at_max() {
        let component = format!("./{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH));
        assert!(validate_path_string("schema.path", &component).is_ok());
    }
}
