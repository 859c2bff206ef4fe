use std::fmt;
use std::sync::Arc;

use rusqlite::Connection;

use super::splitter::split_leading_statement;
use super::statement::SqliteStatement;
use crate::driver::NativeDatabase;
use crate::error::SqlSyncError;
use crate::events::{DbEvent, EventBroker, EventSource};

/// [`NativeDatabase`] over a `rusqlite` connection.
///
/// The connection's rollback hook raises [`DbEvent::Rollback`] on the driver's
/// [`EventBroker`]; that is the signal transactions listen for.
pub struct SqliteDriver {
    conn: Connection,
    events: Arc<EventBroker>,
}

impl SqliteDriver {
    /// Wrap an already-open connection and install the rollback hook.
    ///
    /// Any rollback hook previously set on `conn` is replaced.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        let events = Arc::new(EventBroker::new());
        let hook_events = Arc::clone(&events);
        conn.rollback_hook(Some(move || {
            hook_events.emit(DbEvent::Rollback);
        }));
        Self { conn, events }
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The broker behind [`NativeDatabase::events`], for raising events by hand.
    #[must_use]
    pub fn event_broker(&self) -> &Arc<EventBroker> {
        &self.events
    }
}

impl NativeDatabase for SqliteDriver {
    type Statement<'db> = SqliteStatement<'db>;

    fn prepare<'db>(&'db self, sql: &str) -> Result<Option<SqliteStatement<'db>>, SqlSyncError> {
        let Some(split) = split_leading_statement(sql) else {
            return Ok(None);
        };
        let stmt = self
            .conn
            .prepare(split.statement)
            .map_err(|e| SqlSyncError::PrepareError(format!("{e} (in `{}`)", split.statement)))?;
        Ok(Some(SqliteStatement::new(stmt, split.tail.to_owned())))
    }

    fn changes(&self) -> i64 {
        i64::try_from(self.conn.changes()).unwrap_or(i64::MAX)
    }

    fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    fn events(&self) -> &dyn EventSource {
        &*self.events
    }
}

impl fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("path", &self.conn.path())
            .field("events", &self.events)
            .finish()
    }
}
