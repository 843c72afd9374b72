// crates/jsonapi-steps-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Fixture Store
// Description: Durable FixtureGateway backed by SQLite.
// Purpose: Write scenario fixtures in one transaction per flush.
// Dependencies: jsonapi-steps-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteFixtureStore`] queues [`FixtureEntity`] values in memory and writes
//! them on `flush` inside a single transaction. A failed flush rolls back and
//! leaves the queue intact. Circular reference graphs are inserted first and
//! linked second, using the row ids assigned by `SQLite`.
//!
//! The database carries a `store_meta` version row; opening a database written
//! with another layout fails closed with [`SqliteStoreError::VersionMismatch`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use jsonapi_steps_core::DummyFriend;
use jsonapi_steps_core::FixtureEntity;
use jsonapi_steps_core::FixtureError;
use jsonapi_steps_core::FixtureGateway;
use jsonapi_steps_core::FixtureGraph;
use jsonapi_steps_core::FixtureKind;
use jsonapi_steps_core::FlushReport;
use jsonapi_steps_core::PersistedEntity;
use jsonapi_steps_core::RelatedDummy;
use jsonapi_steps_core::StoredCircularReference;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the fixture tables.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode; lets the system under test read while steps write.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` fixture store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` fixture store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or stored data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for FixtureError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Store(error.to_string())
    }
}

/// Maps a `rusqlite` error into a store error.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed fixture gateway.
///
/// # Invariants
/// - `pending` holds exactly the entities persisted since the last successful
///   flush.
#[derive(Debug)]
pub struct SqliteFixtureStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Open database connection.
    connection: Connection,
    /// Entities queued for the next flush.
    pending: Vec<FixtureEntity>,
}

impl SqliteFixtureStore {
    /// Opens the store, creating the database and tables when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid, the database
    /// cannot be opened, or its schema version differs.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection,
            pending: Vec::new(),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the number of entities waiting for a flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Deletes every fixture row; queued entities are kept.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the delete fails.
    pub fn purge(&mut self) -> Result<(), SqliteStoreError> {
        let tx = self.connection.transaction().map_err(db_error)?;
        tx.execute_batch(
            "DELETE FROM circular_reference_children;
             UPDATE circular_references SET parent_id = NULL;
             DELETE FROM circular_references;
             DELETE FROM dummy_friends;
             DELETE FROM related_dummies;",
        )
        .map_err(db_error)?;
        tx.commit().map_err(db_error)
    }

    /// Returns the number of stored rows of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn count(&self, kind: FixtureKind) -> Result<usize, SqliteStoreError> {
        let count: i64 = self
            .connection
            .query_row(&format!("SELECT COUNT(1) FROM {}", table_for(kind)), params![], |row| {
                row.get(0)
            })
            .map_err(db_error)?;
        usize::try_from(count)
            .map_err(|_| SqliteStoreError::Invalid(format!("negative row count {count}")))
    }

    /// Returns stored identifiers of `kind` in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the query fails.
    pub fn ids(&self, kind: FixtureKind) -> Result<Vec<i64>, SqliteStoreError> {
        let mut stmt = self
            .connection
            .prepare(&format!("SELECT id FROM {} ORDER BY id", table_for(kind)))
            .map_err(db_error)?;
        let rows = stmt.query_map(params![], |row| row.get(0)).map_err(db_error)?;
        rows.collect::<Result<Vec<i64>, _>>().map_err(db_error)
    }

    /// Loads a related dummy by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the query fails.
    pub fn load_related_dummy(&self, id: i64) -> Result<Option<RelatedDummy>, SqliteStoreError> {
        self.connection
            .query_row("SELECT name FROM related_dummies WHERE id = ?1", params![id], |row| {
                Ok(RelatedDummy {
                    name: row.get(0)?,
                })
            })
            .optional()
            .map_err(db_error)
    }

    /// Loads a dummy friend by id.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the query fails.
    pub fn load_dummy_friend(&self, id: i64) -> Result<Option<DummyFriend>, SqliteStoreError> {
        self.connection
            .query_row("SELECT name FROM dummy_friends WHERE id = ?1", params![id], |row| {
                Ok(DummyFriend {
                    name: row.get(0)?,
                })
            })
            .optional()
            .map_err(db_error)
    }

    /// Loads a circular reference row with its children in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the query fails.
    pub fn load_circular_reference(
        &self,
        id: i64,
    ) -> Result<Option<StoredCircularReference>, SqliteStoreError> {
        let parent_id: Option<Option<i64>> = self
            .connection
            .query_row(
                "SELECT parent_id FROM circular_references WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        let Some(parent_id) = parent_id else {
            return Ok(None);
        };
        let mut stmt = self
            .connection
            .prepare(
                "SELECT child_id FROM circular_reference_children
                 WHERE parent_id = ?1 ORDER BY position",
            )
            .map_err(db_error)?;
        let rows = stmt.query_map(params![id], |row| row.get(0)).map_err(db_error)?;
        let children = rows.collect::<Result<Vec<i64>, _>>().map_err(db_error)?;
        Ok(Some(StoredCircularReference {
            id,
            parent_id,
            children,
        }))
    }
}

impl FixtureGateway for SqliteFixtureStore {
    fn persist(&mut self, entity: FixtureEntity) -> Result<(), FixtureError> {
        self.pending.push(entity);
        Ok(())
    }

    fn flush(&mut self) -> Result<FlushReport, FixtureError> {
        let tx = self.connection.transaction().map_err(db_error)?;
        let mut report = FlushReport::default();
        for entity in &self.pending {
            write_entity(&tx, entity, &mut report)?;
        }
        tx.commit().map_err(db_error)?;
        self.pending.clear();
        Ok(report)
    }
}

// ============================================================================
// SECTION: Writes
// ============================================================================

/// Inserts one entity and records its assigned ids.
fn write_entity(
    tx: &Transaction<'_>,
    entity: &FixtureEntity,
    report: &mut FlushReport,
) -> Result<(), SqliteStoreError> {
    match entity {
        FixtureEntity::RelatedDummy(dummy) => {
            tx.execute("INSERT INTO related_dummies (name) VALUES (?1)", params![dummy.name])
                .map_err(db_error)?;
            report.entities.push(PersistedEntity {
                kind: FixtureKind::RelatedDummy,
                id: tx.last_insert_rowid(),
            });
        }
        FixtureEntity::DummyFriend(friend) => {
            tx.execute("INSERT INTO dummy_friends (name) VALUES (?1)", params![friend.name])
                .map_err(db_error)?;
            report.entities.push(PersistedEntity {
                kind: FixtureKind::DummyFriend,
                id: tx.last_insert_rowid(),
            });
        }
        FixtureEntity::CircularReference(graph) => write_graph(tx, graph, report)?,
    }
    Ok(())
}

/// Inserts graph nodes, then links parents and children by assigned ids.
fn write_graph(
    tx: &Transaction<'_>,
    graph: &FixtureGraph,
    report: &mut FlushReport,
) -> Result<(), SqliteStoreError> {
    let mut ids = Vec::with_capacity(graph.len());
    for _ in 0..graph.len() {
        tx.execute("INSERT INTO circular_references (parent_id) VALUES (NULL)", params![])
            .map_err(db_error)?;
        let id = tx.last_insert_rowid();
        ids.push(id);
        report.entities.push(PersistedEntity {
            kind: FixtureKind::CircularReference,
            id,
        });
    }
    let resolve = |index: usize| {
        ids.get(index)
            .copied()
            .ok_or_else(|| SqliteStoreError::Invalid(format!("unknown fixture graph key {index}")))
    };
    for (key, node) in graph.iter() {
        let id = resolve(key.index())?;
        if let Some(parent) = node.parent {
            tx.execute(
                "UPDATE circular_references SET parent_id = ?1 WHERE id = ?2",
                params![resolve(parent.index())?, id],
            )
            .map_err(db_error)?;
        }
        for (position, child) in node.children.iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| SqliteStoreError::Invalid("too many children".to_string()))?;
            tx.execute(
                "INSERT INTO circular_reference_children (parent_id, child_id, position)
                 VALUES (?1, ?2, ?3)",
                params![id, resolve(child.index())?, position],
            )
            .map_err(db_error)?;
        }
    }
    Ok(())
}

/// Returns the table holding rows of `kind`.
const fn table_for(kind: FixtureKind) -> &'static str {
    match kind {
        FixtureKind::RelatedDummy => "related_dummies",
        FixtureKind::DummyFriend => "dummy_friends",
        FixtureKind::CircularReference => "circular_references",
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(())
}

/// Initializes the fixture tables or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS related_dummies (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS dummy_friends (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS circular_references (
                    id INTEGER PRIMARY KEY,
                    parent_id INTEGER REFERENCES circular_references(id)
                );
                CREATE TABLE IF NOT EXISTS circular_reference_children (
                    parent_id INTEGER NOT NULL
                        REFERENCES circular_references(id) ON DELETE CASCADE,
                    child_id INTEGER NOT NULL
                        REFERENCES circular_references(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    PRIMARY KEY (parent_id, child_id)
                );",
            )
            .map_err(db_error)?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "expected schema version {SCHEMA_VERSION}, found {other}"
            )));
        }
    }
    tx.commit().map_err(db_error)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
