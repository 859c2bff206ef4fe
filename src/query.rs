use std::sync::Arc;

use crate::driver::{NativeDatabase, NativeStatement};
use crate::error::SqlSyncError;
use crate::params::ParamSource;
use crate::results::{QueryResult, ResultCollection, ResultSet};
use crate::runner::{Executed, run_statement, with_statement};

/// Run every statement in `sql` in order and collect one result set per statement.
///
/// Statements are discovered by preparing the leading statement and then the tail
/// it leaves behind, until the driver finds nothing more to prepare. A positional
/// source is shared across the statements: each one takes as many values as it has
/// placeholders.
///
/// # Errors
/// Returns the first prepare, bind, step or finalize failure. Statements already run
/// stay run; nothing is rolled back here.
pub fn run_statements<D: NativeDatabase>(
    db: &D,
    sql: &str,
    mut params: ParamSource<'_>,
) -> Result<Vec<ResultSet>, SqlSyncError> {
    let mut sets = Vec::new();
    let mut remaining = sql.to_owned();

    while let Some(prepared) = db.prepare(&remaining)? {
        let index = sets.len();
        let Executed { result_set, tail } = with_statement(prepared, |statement| {
            tracing::debug!(
                index,
                placeholders = statement.bind_parameter_count(),
                "prepared statement"
            );
            params.bind(statement)?;
            run_statement(db, statement)
        })?;
        tracing::debug!(
            index,
            rows = result_set.len(),
            rows_affected = result_set.rows_affected,
            insert_id = result_set.insert_id,
            "statement finished"
        );
        sets.push(result_set);
        remaining = tail;
    }

    Ok(sets)
}

/// Run `sql` and shape the outcome: `None` when it held no statements, otherwise the
/// first result set with the whole collection attached.
///
/// # Errors
/// See [`run_statements`].
pub fn query<D: NativeDatabase>(
    db: &D,
    sql: &str,
    params: ParamSource<'_>,
) -> Result<Option<QueryResult>, SqlSyncError> {
    let sets = run_statements(db, sql, params)?;
    Ok(QueryResult::from_collection(ResultCollection::link(sets)))
}

/// [`query`], then hand the chosen result and every result set to `callback`.
///
/// The callback runs once, after the last statement, and sees the results of all
/// statements, not only the first. It is not called when the query fails.
///
/// # Errors
/// See [`run_statements`].
pub fn query_then<D, F>(
    db: &D,
    sql: &str,
    params: ParamSource<'_>,
    callback: F,
) -> Result<Option<QueryResult>, SqlSyncError>
where
    D: NativeDatabase,
    F: FnOnce(Option<&QueryResult>, &[ResultSet]),
{
    let sets = run_statements(db, sql, params)?;
    let collection = ResultCollection::link(sets);
    let result = QueryResult::from_collection(Arc::clone(&collection));
    callback(result.as_ref(), collection.as_slice());
    Ok(result)
}
