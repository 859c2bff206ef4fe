use std::cell::Cell;

use sql_sync::test_utils::{Call, ScriptedDatabase, StatementScript};
use sql_sync::{
    Database, DbEvent, NativeDatabase, ParamSource, PositionalParams, RowValues, SqlSyncError,
    TxOutcome, TxState,
};

#[test]
fn clean_transaction_commits_and_calls_success() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::new(
        ScriptedDatabase::new()
            .script("INSERT INTO t VALUES (?)", StatementScript::new().placeholders(1).changes(1)),
    );
    let successes = Cell::new(0);
    let errors = Cell::new(0);

    let outcome = db
        .transaction(|tx| {
            assert_eq!(tx.state(), TxState::Running);
            let mut params = PositionalParams::from(vec![RowValues::Int(1), RowValues::Int(2)]);
            tx.execute_sql_with("INSERT INTO t VALUES (?); INSERT INTO t VALUES (?)", &mut params)?;
            assert!(params.is_empty());
            Ok(())
        })
        .on_error(|_| errors.set(errors.get() + 1))
        .on_success(|tx| {
            assert_eq!(tx.state(), TxState::Resolved);
            successes.set(successes.get() + 1);
        })
        .run()?;

    assert_eq!(outcome, TxOutcome::Committed);
    assert_eq!((successes.get(), errors.get()), (1, 0));
    assert_eq!(
        db.driver().completed(),
        vec![
            "BEGIN TRANSACTION".to_owned(),
            "INSERT INTO t VALUES (?)".to_owned(),
            "INSERT INTO t VALUES (?)".to_owned(),
            "COMMIT".to_owned(),
        ]
    );
    assert!(db.driver().is_autocommit());
    // listener is gone once the transaction resolves
    assert_eq!(db.driver().broker().listener_count(DbEvent::Rollback), 0);
    Ok(())
}

#[test]
fn rollback_turns_remaining_statements_into_no_ops() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::new(
        ScriptedDatabase::new()
            .script("INSERT INTO t VALUES (1)", StatementScript::new().changes(1))
            .script("INSERT INTO u VALUES (1)", StatementScript::new().raises_rollback()),
    );
    let successes = Cell::new(0);
    let errors = Cell::new(0);

    let outcome = db
        .transaction(|tx| {
            tx.execute_sql("INSERT INTO t VALUES (1)")?;
            tx.execute_sql("INSERT INTO u VALUES (1)")?;
            assert!(tx.rolled_back());
            assert!(tx.execute_sql("INSERT INTO t VALUES (2)")?.is_none());

            let mut called = false;
            let skipped =
                tx.execute_sql_then("INSERT INTO t VALUES (3)", ParamSource::None, |_, _, _| called = true)?;
            assert!(skipped.is_none());
            assert!(!called);
            Ok(())
        })
        .on_error(|tx| {
            assert_eq!(tx.state(), TxState::Resolved);
            assert!(tx.rolled_back());
            errors.set(errors.get() + 1);
        })
        .on_success(|_| successes.set(successes.get() + 1))
        .run()?;

    assert_eq!(outcome, TxOutcome::RolledBack);
    assert_eq!((successes.get(), errors.get()), (0, 1));

    // the skipped inserts never reached the driver; COMMIT was still attempted
    let prepared: Vec<String> = db
        .driver()
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Prepare(sql) => Some(sql),
            _ => None,
        })
        .collect();
    assert_eq!(
        prepared,
        vec![
            "BEGIN TRANSACTION".to_owned(),
            "INSERT INTO t VALUES (1)".to_owned(),
            "INSERT INTO u VALUES (1)".to_owned(),
            "COMMIT".to_owned(),
        ]
    );
    assert_eq!(db.driver().broker().listener_count(DbEvent::Rollback), 0);
    Ok(())
}

#[test]
fn rollback_from_an_explicit_statement_routes_to_error() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::new(ScriptedDatabase::new());
    let errors = Cell::new(0);

    let outcome = db
        .transaction(|tx| {
            tx.execute_sql("INSERT INTO t VALUES (1); ROLLBACK; INSERT INTO t VALUES (2)")?;
            Ok(())
        })
        .on_error(|_| errors.set(errors.get() + 1))
        .run()?;

    assert_eq!(outcome, TxOutcome::RolledBack);
    assert_eq!(errors.get(), 1);
    // statements in the same string as the ROLLBACK still ran
    assert!(
        db.driver()
            .completed()
            .contains(&"INSERT INTO t VALUES (2)".to_owned())
    );
    Ok(())
}

#[test]
fn work_error_propagates_without_callbacks() {
    let db = Database::new(ScriptedDatabase::new());
    let callbacks = Cell::new(0);

    let err = db
        .transaction(|tx| {
            tx.execute_sql("INSERT INTO t VALUES (1)")?;
            Err(SqlSyncError::Other("caller gave up".into()))
        })
        .on_error(|_| callbacks.set(callbacks.get() + 1))
        .on_success(|_| callbacks.set(callbacks.get() + 1))
        .run()
        .unwrap_err();

    assert!(matches!(err, SqlSyncError::Other(ref msg) if msg == "caller gave up"));
    assert_eq!(callbacks.get(), 0);

    let completed = db.driver().completed();
    assert!(!completed.contains(&"COMMIT".to_owned()));
    // the open transaction was rolled back on the way out
    assert_eq!(completed.last().map(String::as_str), Some("ROLLBACK"));
    assert!(db.driver().is_autocommit());
    assert_eq!(db.driver().broker().listener_count(DbEvent::Rollback), 0);
}

#[test]
fn step_error_inside_work_propagates() {
    let db = Database::new(
        ScriptedDatabase::new().script("SELECT boom", StatementScript::new().fail_after(0)),
    );

    let err = db
        .transaction(|tx| {
            tx.execute_sql("SELECT boom")?;
            Ok(())
        })
        .run()
        .unwrap_err();

    assert!(err.is_step_error());
    assert_eq!(db.driver().finalized_count(), db.driver().prepared_count());
}

#[test]
fn failed_begin_fails_the_transaction() {
    let db = Database::new(ScriptedDatabase::new());
    db.query("BEGIN").expect("outer transaction");
    let ran = Cell::new(false);

    let err = db
        .transaction(|_| {
            ran.set(true);
            Ok(())
        })
        .run()
        .unwrap_err();

    assert!(err.is_step_error());
    assert!(!ran.get());
    assert_eq!(db.driver().broker().listener_count(DbEvent::Rollback), 0);
}
