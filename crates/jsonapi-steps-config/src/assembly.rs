// crates/jsonapi-steps-config/src/assembly.rs
// ============================================================================
// Module: Context Assembly
// Description: Builds the assertion helper and its collaborators from config.
// Purpose: Give suites one call that wires schema, driver, store, and audit.
// Dependencies: jsonapi-steps-core, jsonapi-steps-http, jsonapi-steps-store-sqlite
// ============================================================================

//! ## Overview
//! Each collaborator has its own builder so suites can assemble partial
//! contexts (for example, a store without a driver for seeding). The
//! configured gateway is an enum over the supported backends.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use jsonapi_steps_core::ConfigurationError;
use jsonapi_steps_core::FileAuditSink;
use jsonapi_steps_core::FixtureEntity;
use jsonapi_steps_core::FixtureError;
use jsonapi_steps_core::FixtureGateway;
use jsonapi_steps_core::FlushReport;
use jsonapi_steps_core::InMemoryFixtureGateway;
use jsonapi_steps_core::JsonApiContext;
use jsonapi_steps_core::NoopAuditSink;
use jsonapi_steps_core::SchemaDocument;
use jsonapi_steps_core::StderrAuditSink;
use jsonapi_steps_core::StepAuditSink;
use jsonapi_steps_http::HttpDriver;
use jsonapi_steps_http::HttpDriverConfig;
use jsonapi_steps_store_sqlite::SqliteFixtureStore;
use jsonapi_steps_store_sqlite::SqliteStoreConfig;

use crate::config::AuditSinkType;
use crate::config::ConfigError;
use crate::config::JsonApiStepsConfig;
use crate::config::StoreType;

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Fixture gateway selected by configuration.
#[derive(Debug)]
pub enum ConfiguredGateway {
    /// In-memory gateway.
    Memory(InMemoryFixtureGateway),
    /// `SQLite` fixture store.
    Sqlite(SqliteFixtureStore),
}

impl ConfiguredGateway {
    /// Removes every stored fixture.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Store`] when the backend fails.
    pub fn purge(&mut self) -> Result<(), FixtureError> {
        match self {
            Self::Memory(gateway) => {
                *gateway = InMemoryFixtureGateway::new();
                Ok(())
            }
            Self::Sqlite(store) => Ok(store.purge()?),
        }
    }
}

impl FixtureGateway for ConfiguredGateway {
    fn persist(&mut self, entity: FixtureEntity) -> Result<(), FixtureError> {
        match self {
            Self::Memory(gateway) => gateway.persist(entity),
            Self::Sqlite(store) => store.persist(entity),
        }
    }

    fn flush(&mut self) -> Result<FlushReport, FixtureError> {
        match self {
            Self::Memory(gateway) => gateway.flush(),
            Self::Sqlite(store) => store.flush(),
        }
    }
}

/// Assertion helper wired from configuration.
pub type ConfiguredContext = JsonApiContext<HttpDriver, ConfiguredGateway>;

// ============================================================================
// SECTION: Builders
// ============================================================================

impl JsonApiStepsConfig {
    /// Loads the configured schema document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the schema file is missing or
    /// unreadable, and [`ConfigError::Invalid`] when it is not usable.
    pub fn schema_document(&self) -> Result<SchemaDocument, ConfigError> {
        SchemaDocument::load(&self.schema.path)
            .and_then(|schema| schema.with_max_ref_depth(self.schema.max_ref_depth))
            .map_err(|err| match err {
                ConfigurationError::MissingSchema(_) | ConfigurationError::Io { .. } => {
                    ConfigError::Io(err.to_string())
                }
                _ => ConfigError::Invalid(err.to_string()),
            })
    }

    /// Builds the HTTP driver.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `http.base_url` is unset or the
    /// client cannot be built.
    pub fn http_driver(&self) -> Result<HttpDriver, ConfigError> {
        let base_url = self.http.base_url.as_deref().ok_or_else(|| {
            ConfigError::Invalid("http.base_url is required to build the driver".to_string())
        })?;
        let mut config = HttpDriverConfig::new(base_url)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        config.timeout_ms = self.http.timeout_ms;
        config.max_response_bytes = self.http.max_response_bytes;
        HttpDriver::new(config).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Opens the configured fixture gateway.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the `SQLite` store cannot be opened.
    pub fn fixture_gateway(&self) -> Result<ConfiguredGateway, ConfigError> {
        match (self.store.store_type, &self.store.path) {
            (StoreType::Memory, _) => Ok(ConfiguredGateway::Memory(InMemoryFixtureGateway::new())),
            (StoreType::Sqlite, Some(path)) => {
                let config = SqliteStoreConfig {
                    path: path.clone(),
                    busy_timeout_ms: self.store.busy_timeout_ms,
                    journal_mode: self.store.journal_mode,
                    sync_mode: self.store.sync_mode,
                };
                SqliteFixtureStore::new(config)
                    .map(ConfiguredGateway::Sqlite)
                    .map_err(|err| ConfigError::Io(err.to_string()))
            }
            (StoreType::Sqlite, None) => {
                Err(ConfigError::Invalid("sqlite store requires path".to_string()))
            }
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn audit_sink(&self) -> Result<Arc<dyn StepAuditSink>, ConfigError> {
        match (self.audit.sink, &self.audit.path) {
            (AuditSinkType::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkType::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkType::File, Some(path)) => FileAuditSink::new(path)
                .map(|sink| Arc::new(sink) as Arc<dyn StepAuditSink>)
                .map_err(|err| ConfigError::Io(err.to_string())),
            (AuditSinkType::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
        }
    }

    /// Assembles the assertion helper.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] raised by a collaborator builder.
    pub fn build_context(&self) -> Result<ConfiguredContext, ConfigError> {
        let schema = self.schema_document()?;
        let driver = self.http_driver()?;
        let gateway = self.fixture_gateway()?;
        let audit = self.audit_sink()?;
        Ok(JsonApiContext::from_schema(schema, driver, gateway).with_audit_sink(audit))
    }
}
