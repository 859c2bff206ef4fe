use std::time::Duration;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::connection::SqliteDriver;
use crate::database::Database;
use crate::error::SqlSyncError;

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteOptions {
    /// File path, `:memory:`, or a `file:` URI.
    pub db_path: String,
    /// Switch the journal to WAL after opening.
    #[serde(default)]
    pub wal: bool,
    /// How long a statement waits on a locked database before failing.
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    /// Enforce foreign key constraints.
    #[serde(default)]
    pub foreign_keys: bool,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            wal: false,
            busy_timeout_ms: None,
            foreign_keys: false,
        }
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    /// Read options from a JSON document such as `{"db_path": "app.db", "wal": true}`.
    ///
    /// # Errors
    /// Returns `SqlSyncError::ConfigError` if the document does not describe options.
    pub fn from_json(json: &str) -> Result<Self, SqlSyncError> {
        let opts: SqliteOptions = serde_json::from_str(json)?;
        if opts.db_path.trim().is_empty() {
            return Err(SqlSyncError::ConfigError("db_path must not be empty".into()));
        }
        Ok(opts)
    }

    /// Open a connection with these options applied.
    ///
    /// # Errors
    /// Returns `SqlSyncError` if the file cannot be opened or a pragma fails.
    pub fn open_connection(&self) -> Result<Connection, SqlSyncError> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            SqlSyncError::ConnectionError(format!("failed to open {}: {e}", self.db_path))
        })?;
        if let Some(ms) = self.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }
        if self.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        if self.wal {
            // journal_mode returns a row, so read it rather than execute_batch
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            tracing::debug!(path = %self.db_path, journal_mode = %mode, "applied journal mode");
        }
        Ok(conn)
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Open a [`Database`] with the configured options.
    ///
    /// # Errors
    /// Returns `SqlSyncError` if the connection cannot be opened or configured.
    pub fn build(self) -> Result<Database<SqliteDriver>, SqlSyncError> {
        open_database_sync(self.finish())
    }
}

impl Database<SqliteDriver> {
    #[must_use]
    pub fn sqlite_builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }
}

/// Open a `SQLite` database for synchronous use.
///
/// # Errors
/// Returns `SqlSyncError` if the connection cannot be opened or configured.
pub fn open_database_sync(opts: SqliteOptions) -> Result<Database<SqliteDriver>, SqlSyncError> {
    let conn = opts.open_connection()?;
    tracing::debug!(path = %opts.db_path, "opened sqlite database");
    Ok(Database::new(SqliteDriver::from_connection(conn)))
}

/// Open a database and hand it to `creation_callback` before returning it,
/// typically to create the schema.
///
/// # Errors
/// Returns open failures and any error returned by the callback.
pub fn open_database_sync_with<F>(
    opts: SqliteOptions,
    creation_callback: F,
) -> Result<Database<SqliteDriver>, SqlSyncError>
where
    F: FnOnce(&Database<SqliteDriver>) -> Result<(), SqlSyncError>,
{
    let db = open_database_sync(opts)?;
    creation_callback(&db)?;
    Ok(db)
}
