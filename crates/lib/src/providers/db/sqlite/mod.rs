use crate::errors::ProviderError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{self, Debug};
use tracing::debug;
use turso::{Connection, Database, Row, Value as TursoValue};

mod campaigns;
mod content;
mod messages;
pub mod sql;

/// A provider for interacting with a local SQLite database using Turso.
///
/// This is the relational store: content items, campaigns and chat history live here.
/// When cloned, it shares the same underlying database, allowing for concurrent and
/// shared access to the same database file or in-memory instance.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path or in-memory.
    ///
    /// # Arguments
    ///
    /// * `db_path`: The path to the SQLite database file. Use ":memory:" for a unique,
    ///   isolated in-memory database. To share an in-memory database across multiple
    ///   components (e.g., in tests), create one provider and then `.clone()` it.
    pub async fn new(db_path: &str) -> Result<Self, ProviderError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| ProviderError::StorageConnection(e.to_string()))?;

        // WAL has no effect on in-memory databases but is safe to run.
        let conn = db
            .connect()
            .map_err(|e| ProviderError::StorageConnection(e.to_string()))?;
        // Use `query` for PRAGMA statements that return a value to avoid "unexpected row" errors.
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| ProviderError::StorageConnection(e.to_string()))?;

        Ok(Self { db })
    }

    /// Wraps an existing database handle, e.g. one shared with the job store.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Ensures that all required application tables and indexes exist.
    /// This function is idempotent and safe to call on every application startup.
    pub async fn initialize_schema(&self) -> Result<(), ProviderError> {
        let conn = self.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ())
                .await
                .map_err(|e| ProviderError::StorageOperationFailed(e.to_string()))?;
        }
        debug!("SQLite schema initialized");
        Ok(())
    }

    pub(crate) fn connect(&self) -> Result<Connection, ProviderError> {
        self.db
            .connect()
            .map_err(|e| ProviderError::StorageConnection(e.to_string()))
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteProvider {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}

// --- Row decoding helpers shared by the SQLite-backed stores ---

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ProviderError::StorageOperationFailed(format!("bad timestamp '{raw}': {e}")))
}

pub(crate) fn opt_text(row: &Row, idx: usize) -> Result<Option<String>, ProviderError> {
    match row.get_value(idx)? {
        TursoValue::Text(s) => Ok(Some(s)),
        TursoValue::Null => Ok(None),
        TursoValue::Integer(i) => Ok(Some(i.to_string())),
        TursoValue::Real(f) => Ok(Some(f.to_string())),
        TursoValue::Blob(_) => Err(ProviderError::StorageOperationFailed(format!(
            "column {idx} holds a blob, expected text"
        ))),
    }
}

pub(crate) fn text(row: &Row, idx: usize) -> Result<String, ProviderError> {
    opt_text(row, idx)?.ok_or_else(|| {
        ProviderError::StorageOperationFailed(format!("column {idx} is unexpectedly NULL"))
    })
}

pub(crate) fn integer(row: &Row, idx: usize) -> Result<i64, ProviderError> {
    match row.get_value(idx)? {
        TursoValue::Integer(i) => Ok(i),
        TursoValue::Null => Ok(0),
        _ => Err(ProviderError::StorageOperationFailed(format!(
            "column {idx} is not an integer"
        ))),
    }
}

/// Parses a stored enum label, reporting corrupt rows as storage failures.
pub(crate) fn parse_label<T>(raw: &str) -> Result<T, ProviderError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(ProviderError::StorageOperationFailed)
}
