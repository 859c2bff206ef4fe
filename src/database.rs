use std::fmt;

use crate::driver::NativeDatabase;
use crate::error::SqlSyncError;
use crate::params::ParamSource;
use crate::query;
use crate::results::{QueryResult, ResultSet};
use crate::transaction::{Transaction, TransactionRunner};

/// Synchronous query and transaction API over one native database handle.
///
/// The driver is supplied by the caller and stays open for the life of the
/// `Database`; nothing here closes it.
/// ```rust
/// use sql_sync::prelude::*;
///
/// let db = open_database_sync(SqliteOptions::new(":memory:".into()))?;
/// db.query("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")?;
///
/// let mut params = PositionalParams::from(vec![RowValues::from("alice"), RowValues::from("bob")]);
/// let result = db
///     .query_with(
///         "INSERT INTO t (name) VALUES (?); INSERT INTO t (name) VALUES (?); SELECT name FROM t;",
///         &mut params,
///     )?
///     .expect("three statements");
///
/// assert_eq!(result.all().len(), 3);
/// assert_eq!(result.all()[2].len(), 2);
/// assert!(params.is_empty());
/// # Ok::<(), SqlSyncError>(())
/// ```
pub struct Database<D: NativeDatabase> {
    driver: D,
}

impl<D: NativeDatabase> Database<D> {
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Run every statement in `sql` without parameters.
    ///
    /// # Errors
    /// Returns the first prepare, step or finalize failure.
    pub fn query(&self, sql: &str) -> Result<Option<QueryResult>, SqlSyncError> {
        query::query(&self.driver, sql, ParamSource::None)
    }

    /// Run every statement in `sql`, binding from `params`.
    ///
    /// A positional queue is consumed across the statements; a named mapping is
    /// bound to each of them unchanged.
    ///
    /// # Errors
    /// Returns the first prepare, bind, step or finalize failure, including
    /// [`SqlSyncError::ParameterCountMismatch`] when a positional queue runs dry.
    pub fn query_with<'p>(
        &self,
        sql: &str,
        params: impl Into<ParamSource<'p>>,
    ) -> Result<Option<QueryResult>, SqlSyncError> {
        query::query(&self.driver, sql, params.into())
    }

    /// Like [`Database::query_with`], then call `callback` with the chosen result and every result set.
    ///
    /// # Errors
    /// Same as [`Database::query_with`]; the callback does not run on failure.
    pub fn query_then<'p, F>(
        &self,
        sql: &str,
        params: impl Into<ParamSource<'p>>,
        callback: F,
    ) -> Result<Option<QueryResult>, SqlSyncError>
    where
        F: FnOnce(Option<&QueryResult>, &[ResultSet]),
    {
        query::query_then(&self.driver, sql, params.into(), callback)
    }

    /// Start building a transaction around `work`.
    ///
    /// Nothing touches the database until [`TransactionRunner::run`] is called.
    pub fn transaction<'db, W>(&'db self, work: W) -> TransactionRunner<'db, D>
    where
        W: FnOnce(&Transaction<'db, D>) -> Result<(), SqlSyncError> + 'db,
    {
        TransactionRunner::new(self, work)
    }
}

impl<D: NativeDatabase + fmt::Debug> fmt::Debug for Database<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("driver", &self.driver)
            .finish()
    }
}
