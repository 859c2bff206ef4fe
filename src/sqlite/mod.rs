// SQLite backend: a rusqlite connection exposed through the driver traits.
//
// - config: options, builder and the open functions
// - connection: the driver (prepare, counters, rollback hook)
// - statement: prepared statement wrapper
// - params: value conversion between RowValues and rusqlite
// - splitter: leading statement / tail discovery

pub mod config;
pub mod connection;
pub mod params;
mod splitter;
pub mod statement;

pub use config::{SqliteOptions, SqliteOptionsBuilder, open_database_sync, open_database_sync_with};
pub use connection::SqliteDriver;
pub use statement::SqliteStatement;
