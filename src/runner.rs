use std::sync::Arc;

use crate::driver::{NativeDatabase, NativeStatement};
use crate::error::SqlSyncError;
use crate::results::ResultSet;

/// Run `body` against `statement`, then finalize it exactly once.
///
/// When `body` succeeds a finalize failure is returned. When `body` fails its
/// error wins and a finalize failure is only logged.
///
/// # Errors
/// Returns the error from `body`, otherwise the driver's finalize error.
pub fn with_statement<S, T, F>(mut statement: S, body: F) -> Result<T, SqlSyncError>
where
    S: NativeStatement,
    F: FnOnce(&mut S) -> Result<T, SqlSyncError>,
{
    let outcome = body(&mut statement);
    let finalized = statement.finalize();
    match outcome {
        Ok(value) => finalized.map(|()| value),
        Err(err) => {
            if let Err(finalize_err) = finalized {
                tracing::warn!(error = %finalize_err, "failed to finalize statement on error path");
            }
            Err(err)
        }
    }
}

/// A statement's result set together with the SQL left after it.
#[derive(Debug)]
pub struct Executed {
    pub result_set: ResultSet,
    pub tail: String,
}

/// Step a bound statement to completion.
///
/// `rows_affected` and `insert_id` are the handle's counters read right after the
/// last step, so they include the effects of earlier statements on the handle.
///
/// # Errors
/// Returns the first step failure.
pub fn run_statement<D, S>(db: &D, statement: &mut S) -> Result<Executed, SqlSyncError>
where
    D: NativeDatabase,
    S: NativeStatement,
{
    let mut result_set = ResultSet::default();
    result_set.set_column_names(Arc::new(statement.column_names()));

    while let Some(row_values) = statement.step()? {
        result_set.add_row_values(row_values);
    }

    result_set.rows_affected = db.changes();
    result_set.insert_id = db.last_insert_rowid();

    Ok(Executed {
        result_set,
        tail: statement.tail().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Call, ScriptedDatabase, ScriptedStatement, StatementScript};
    use crate::types::RowValues;

    fn prepared<'db>(db: &'db ScriptedDatabase, sql: &str) -> ScriptedStatement<'db> {
        db.prepare(sql).unwrap().unwrap()
    }

    #[test]
    fn finalizes_after_success_and_keeps_tail() {
        let db = ScriptedDatabase::new().script(
            "SELECT a",
            StatementScript::new().returning(&["a"], vec![vec![RowValues::Int(1)]]),
        );
        let executed = with_statement(prepared(&db, "SELECT a; SELECT b"), |statement| {
            run_statement(&db, statement)
        })
        .unwrap();

        assert_eq!(executed.result_set.len(), 1);
        assert_eq!(executed.tail, " SELECT b");
        assert_eq!(db.calls().last(), Some(&Call::Finalize("SELECT a".into())));
        assert_eq!(db.finalized_count(), 1);
    }

    #[test]
    fn finalizes_once_when_body_fails() {
        let db = ScriptedDatabase::new().script("SELECT a", StatementScript::new().fail_after(0));
        let err = with_statement(prepared(&db, "SELECT a"), |statement| {
            run_statement(&db, statement)
        })
        .unwrap_err();

        assert!(err.is_step_error());
        assert_eq!(db.finalized_count(), 1);
    }

    #[test]
    fn body_error_is_returned_before_stepping() {
        let db = ScriptedDatabase::new();
        let err = with_statement(prepared(&db, "SELECT a"), |_| -> Result<(), SqlSyncError> {
            Err(SqlSyncError::ParameterError("refused".into()))
        })
        .unwrap_err();

        assert!(matches!(err, SqlSyncError::ParameterError(_)));
        assert!(db.completed().is_empty());
        assert_eq!(db.finalized_count(), 1);
    }
}
