//! Synchronous multi-statement queries and rollback-aware transactions over an
//! embedded SQL driver.
//!
//! A [`Database`] wraps a [`NativeDatabase`] handle. [`Database::query_with`] runs
//! every statement in a SQL string, binding positional parameters across them or
//! named parameters to each, and returns the first statement's [`ResultSet`] with
//! the others attached. [`Database::transaction`] wraps work in BEGIN/COMMIT and
//! watches the handle's rollback event so that a rollback raised mid-transaction
//! turns the remaining statements into no-ops and routes completion to the
//! error callback.

pub mod database;
pub mod driver;
pub mod error;
pub mod events;
pub mod params;
pub mod prelude;
pub mod query;
pub mod results;
pub mod runner;
pub mod transaction;
pub mod tx_outcome;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use database::Database;
pub use driver::{NativeDatabase, NativeStatement};
pub use error::SqlSyncError;
pub use events::{DbEvent, EventBroker, EventSource, Listener, ListenerId};
pub use params::{NamedParams, ParamSource, PositionalParams};
pub use results::{CustomDbRow, QueryResult, ResultCollection, ResultSet, RowsView};
pub use transaction::{Transaction, TransactionRunner, TxState};
pub use tx_outcome::TxOutcome;
pub use types::{RowValues, SQLITE_DELETE, SQLITE_INSERT, SQLITE_UPDATE, UpdateAction};

#[cfg(feature = "sqlite")]
pub use sqlite::{
    SqliteDriver, SqliteOptions, SqliteOptionsBuilder, open_database_sync, open_database_sync_with,
};
