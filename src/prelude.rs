//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::database::Database;
pub use crate::driver::{NativeDatabase, NativeStatement};
pub use crate::error::SqlSyncError;
pub use crate::events::{DbEvent, EventSource};
pub use crate::params::{NamedParams, ParamSource, PositionalParams};
pub use crate::results::{CustomDbRow, QueryResult, ResultSet};
pub use crate::transaction::{Transaction, TxState};
pub use crate::tx_outcome::TxOutcome;
pub use crate::types::{RowValues, UpdateAction};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{
    SqliteDriver, SqliteOptions, SqliteOptionsBuilder, open_database_sync, open_database_sync_with,
};
