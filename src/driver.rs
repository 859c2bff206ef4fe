//! Primitive operations the query runner needs from a native driver.
//!
//! Anything that can prepare, bind, step and finalize statements and report the
//! handle's change counters can sit under a [`crate::Database`].

use crate::error::SqlSyncError;
use crate::events::EventSource;
use crate::types::RowValues;

/// A database handle as seen by the query runner.
pub trait NativeDatabase {
    type Statement<'db>: NativeStatement
    where
        Self: 'db;

    /// Prepare the leading statement of `sql`.
    ///
    /// Returns `Ok(None)` when `sql` holds no further statements (empty, whitespace
    /// or comments only). The returned statement exposes the unconsumed remainder
    /// through [`NativeStatement::tail`].
    ///
    /// # Errors
    /// Returns [`SqlSyncError::PrepareError`] when the leading statement is malformed.
    fn prepare<'db>(&'db self, sql: &str) -> Result<Option<Self::Statement<'db>>, SqlSyncError>;

    /// Rows changed by the most recent mutating statement on this handle.
    fn changes(&self) -> i64;

    /// Row id of the most recent successful insert on this handle.
    fn last_insert_rowid(&self) -> i64;

    /// `false` while an explicit transaction is open on this handle.
    fn is_autocommit(&self) -> bool;

    /// Notification side of the handle.
    fn events(&self) -> &dyn EventSource;
}

/// A prepared statement owned by the statement runner until it is finalized.
pub trait NativeStatement {
    /// SQL text following this statement in the string it was prepared from.
    fn tail(&self) -> &str;

    fn bind_parameter_count(&self) -> usize;

    /// Bind `value` to the 1-based `position`.
    ///
    /// # Errors
    /// Returns [`SqlSyncError::ParameterError`] if the driver rejects the binding.
    fn bind_index(&mut self, position: usize, value: &RowValues) -> Result<(), SqlSyncError>;

    /// Bind `value` to the placeholder spelled exactly `name` (prefix included).
    ///
    /// Returns `Ok(false)` when the statement has no such placeholder.
    ///
    /// # Errors
    /// Returns [`SqlSyncError::ParameterError`] if the driver rejects the binding.
    fn bind_name(&mut self, name: &str, value: &RowValues) -> Result<bool, SqlSyncError>;

    fn column_names(&self) -> Vec<String>;

    /// Advance to the next row. `Ok(None)` means the statement is exhausted.
    ///
    /// # Errors
    /// Returns [`SqlSyncError::StepError`] when execution fails.
    fn step(&mut self) -> Result<Option<Vec<RowValues>>, SqlSyncError>;

    /// Release the native statement.
    ///
    /// # Errors
    /// Returns [`SqlSyncError::FinalizeError`] if the driver reports a failure.
    fn finalize(self) -> Result<(), SqlSyncError>
    where
        Self: Sized;
}
