use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::database::Database;
use crate::driver::NativeDatabase;
use crate::error::SqlSyncError;
use crate::events::{DbEvent, EventSource, ListenerId};
use crate::params::ParamSource;
use crate::query;
use crate::results::{QueryResult, ResultSet};
use crate::tx_outcome::TxOutcome;

type Work<'db, D> = Box<dyn FnOnce(&Transaction<'db, D>) -> Result<(), SqlSyncError> + 'db>;
type Completion<'db, D> = Box<dyn FnOnce(&Transaction<'db, D>) + 'db>;

/// Where a transaction is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Listener registered, BEGIN being issued.
    Started,
    /// The work callback is running.
    Running,
    /// Work finished after a rollback was observed.
    RolledBack,
    /// Work finished without a rollback.
    Clean,
    /// COMMIT issued and the completion callback chosen.
    Resolved,
}

/// Handle passed to the work callback and to the completion callbacks.
pub struct Transaction<'db, D: NativeDatabase> {
    db: &'db Database<D>,
    rolled_back: Arc<AtomicBool>,
    state: Cell<TxState>,
}

impl<'db, D: NativeDatabase> Transaction<'db, D> {
    #[must_use]
    pub fn database(&self) -> &'db Database<D> {
        self.db
    }

    /// Whether the handle has reported a rollback since BEGIN.
    #[must_use]
    pub fn rolled_back(&self) -> bool {
        self.rolled_back.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.state.get()
    }

    /// Run `sql` inside the transaction.
    ///
    /// Once a rollback has been observed this returns `Ok(None)` without touching
    /// the database, so the rest of the work becomes a no-op.
    ///
    /// # Errors
    /// Returns any query failure, or [`SqlSyncError::Other`] when called on a
    /// transaction that already resolved cleanly.
    pub fn execute_sql(&self, sql: &str) -> Result<Option<QueryResult>, SqlSyncError> {
        self.execute_sql_with(sql, ParamSource::None)
    }

    /// [`Transaction::execute_sql`] with parameters.
    ///
    /// # Errors
    /// See [`Transaction::execute_sql`].
    pub fn execute_sql_with<'p>(
        &self,
        sql: &str,
        params: impl Into<ParamSource<'p>>,
    ) -> Result<Option<QueryResult>, SqlSyncError> {
        if !self.accepts_statements()? {
            return Ok(None);
        }
        query::query(self.db.driver(), sql, params.into())
    }

    /// [`Transaction::execute_sql_with`], then call `callback` with the result, this
    /// transaction and every result set. Skipped statements do not call back.
    ///
    /// # Errors
    /// See [`Transaction::execute_sql`].
    pub fn execute_sql_then<'p, F>(
        &self,
        sql: &str,
        params: impl Into<ParamSource<'p>>,
        callback: F,
    ) -> Result<Option<QueryResult>, SqlSyncError>
    where
        F: FnOnce(Option<&QueryResult>, &Self, &[ResultSet]),
    {
        if !self.accepts_statements()? {
            return Ok(None);
        }
        query::query_then(self.db.driver(), sql, params.into(), |result, all| {
            callback(result, self, all);
        })
    }

    fn accepts_statements(&self) -> Result<bool, SqlSyncError> {
        if self.rolled_back() {
            tracing::debug!("transaction rolled back; skipping statement");
            return Ok(false);
        }
        if self.state() == TxState::Resolved {
            return Err(SqlSyncError::Other("transaction already resolved".into()));
        }
        Ok(true)
    }

    /// Best-effort ROLLBACK when leaving through an error with a transaction still open.
    fn abandon(&self) {
        let driver = self.db.driver();
        if driver.is_autocommit() {
            return;
        }
        if let Err(err) = query::query(driver, "ROLLBACK", ParamSource::None) {
            tracing::warn!(error = %err, "rollback after failed transaction did not succeed");
        }
    }
}

impl<D: NativeDatabase> fmt::Debug for Transaction<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("rolled_back", &self.rolled_back())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Removes the rollback listener when the transaction leaves by any path.
struct ListenerRegistration<'a> {
    events: &'a dyn EventSource,
    id: ListenerId,
}

impl<'a> ListenerRegistration<'a> {
    fn rollback_flag(events: &'a dyn EventSource, flag: &Arc<AtomicBool>) -> Self {
        let flag = Arc::clone(flag);
        let id = events.add_listener(
            DbEvent::Rollback,
            Arc::new(move || flag.store(true, Ordering::SeqCst)),
        );
        Self { events, id }
    }
}

impl Drop for ListenerRegistration<'_> {
    fn drop(&mut self) {
        self.events.remove_listener(DbEvent::Rollback, self.id);
    }
}

/// A transaction waiting to run; built by [`Database::transaction`].
/// ```rust
/// use sql_sync::prelude::*;
///
/// let db = open_database_sync(SqliteOptions::new(":memory:".into()))?;
/// db.query("CREATE TABLE t (v INTEGER)")?;
///
/// let outcome = db
///     .transaction(|tx| {
///         tx.execute_sql("INSERT INTO t VALUES (1)")?;
///         tx.execute_sql("INSERT INTO t VALUES (2)")?;
///         Ok(())
///     })
///     .on_error(|_| panic!("no rollback expected"))
///     .on_success(|tx| assert!(!tx.rolled_back()))
///     .run()?;
///
/// assert_eq!(outcome, TxOutcome::Committed);
/// # Ok::<(), SqlSyncError>(())
/// ```
pub struct TransactionRunner<'db, D: NativeDatabase> {
    db: &'db Database<D>,
    work: Work<'db, D>,
    on_error: Option<Completion<'db, D>>,
    on_success: Option<Completion<'db, D>>,
}

impl<'db, D: NativeDatabase> TransactionRunner<'db, D> {
    pub(crate) fn new<W>(db: &'db Database<D>, work: W) -> Self
    where
        W: FnOnce(&Transaction<'db, D>) -> Result<(), SqlSyncError> + 'db,
    {
        Self {
            db,
            work: Box::new(work),
            on_error: None,
            on_success: None,
        }
    }

    /// Called, after COMMIT, when a rollback was observed.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Transaction<'db, D>) + 'db,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Called, after COMMIT, when no rollback was observed.
    #[must_use]
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&Transaction<'db, D>) + 'db,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// BEGIN, run the work, COMMIT, then fire exactly one completion callback.
    ///
    /// COMMIT is issued even when a rollback was observed; an error it reports in
    /// that case is expected (the driver has already closed the transaction) and is
    /// only logged.
    ///
    /// # Errors
    /// Returns BEGIN failures, any error returned by the work callback (no COMMIT is
    /// issued and no callback fires; an open transaction is rolled back), and COMMIT
    /// failures when no rollback was observed.
    pub fn run(self) -> Result<TxOutcome, SqlSyncError> {
        let TransactionRunner {
            db,
            work,
            on_error,
            on_success,
        } = self;

        let rolled_back = Arc::new(AtomicBool::new(false));
        let registration = ListenerRegistration::rollback_flag(db.driver().events(), &rolled_back);
        let tx = Transaction {
            db,
            rolled_back,
            state: Cell::new(TxState::Started),
        };

        tracing::debug!("beginning transaction");
        tx.execute_sql("BEGIN TRANSACTION")?;
        tx.state.set(TxState::Running);

        if let Err(err) = work(&tx) {
            drop(registration);
            tracing::debug!(error = %err, "transaction work failed");
            tx.abandon();
            return Err(err);
        }

        let observed = tx.rolled_back();
        tx.state.set(if observed {
            TxState::RolledBack
        } else {
            TxState::Clean
        });

        tracing::debug!(rolled_back = observed, "committing transaction");
        if let Err(err) = query::query(db.driver(), "COMMIT", ParamSource::None) {
            if observed {
                tracing::debug!(error = %err, "COMMIT after rollback reported an error");
            } else {
                drop(registration);
                tx.abandon();
                return Err(err);
            }
        }
        drop(registration);

        let outcome = if tx.rolled_back() {
            TxOutcome::RolledBack
        } else {
            TxOutcome::Committed
        };
        tx.state.set(TxState::Resolved);

        match outcome {
            TxOutcome::RolledBack => {
                if let Some(callback) = on_error {
                    callback(&tx);
                }
            }
            TxOutcome::Committed => {
                if let Some(callback) = on_success {
                    callback(&tx);
                }
            }
        }
        Ok(outcome)
    }
}
