use std::cell::RefCell;
use std::collections::HashMap;

use crate::driver::{NativeDatabase, NativeStatement};
use crate::error::SqlSyncError;
use crate::events::{DbEvent, EventBroker, EventSource};
use crate::types::RowValues;

/// Driver call recorded by [`ScriptedDatabase`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Prepare(String),
    BindIndex(usize, RowValues),
    BindName(String, RowValues),
    Finalize(String),
}

/// What a statement does when it runs against a [`ScriptedDatabase`].
#[derive(Debug, Clone, Default)]
pub struct StatementScript {
    columns: Vec<String>,
    rows: Vec<Vec<RowValues>>,
    placeholders: Vec<String>,
    changes: Option<i64>,
    insert_id: Option<i64>,
    fail_after: Option<usize>,
    raises_rollback: bool,
    prepare_error: bool,
}

impl StatementScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn returning(mut self, columns: &[&str], rows: Vec<Vec<RowValues>>) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_owned()).collect();
        self.rows = rows;
        self
    }

    /// `count` positional placeholders, `?1` through `?count`.
    #[must_use]
    pub fn placeholders(mut self, count: usize) -> Self {
        self.placeholders = (1..=count).map(|i| format!("?{i}")).collect();
        self
    }

    /// Named placeholders, spelled with their prefix (`:id`).
    #[must_use]
    pub fn named(mut self, names: &[&str]) -> Self {
        self.placeholders = names.iter().map(|n| (*n).to_owned()).collect();
        self
    }

    /// Handle change counter after the statement finishes.
    #[must_use]
    pub fn changes(mut self, changes: i64) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Handle last-insert id after the statement finishes.
    #[must_use]
    pub fn insert_id(mut self, id: i64) -> Self {
        self.insert_id = Some(id);
        self
    }

    /// Fail the step after `rows` rows have been produced.
    #[must_use]
    pub fn fail_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    /// Roll the transaction back when the statement finishes, the way a constraint
    /// declared `ON CONFLICT ROLLBACK` would.
    #[must_use]
    pub fn raises_rollback(mut self) -> Self {
        self.raises_rollback = true;
        self
    }

    #[must_use]
    pub fn fails_to_prepare(mut self) -> Self {
        self.prepare_error = true;
        self
    }
}

#[derive(Debug)]
struct ScriptState {
    changes: i64,
    last_insert_rowid: i64,
    autocommit: bool,
    calls: Vec<Call>,
    completed: Vec<String>,
}

/// In-memory [`NativeDatabase`] whose statements follow per-SQL scripts.
///
/// Statements are split on `;` and matched by their trimmed text; unscripted
/// statements run with no placeholders and no rows. `BEGIN`, `COMMIT` and
/// `ROLLBACK` track transaction state the way `SQLite` does, including failing a
/// `COMMIT` when no transaction is open and raising the rollback event on
/// `ROLLBACK`.
#[derive(Debug)]
pub struct ScriptedDatabase {
    scripts: HashMap<String, StatementScript>,
    state: RefCell<ScriptState>,
    events: EventBroker,
}

impl Default for ScriptedDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            state: RefCell::new(ScriptState {
                changes: 0,
                last_insert_rowid: 0,
                autocommit: true,
                calls: Vec::new(),
                completed: Vec::new(),
            }),
            events: EventBroker::new(),
        }
    }

    #[must_use]
    pub fn script(mut self, sql: &str, script: StatementScript) -> Self {
        self.scripts.insert(sql.trim().to_owned(), script);
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Statements that ran to completion, in order.
    #[must_use]
    pub fn completed(&self) -> Vec<String> {
        self.state.borrow().completed.clone()
    }

    #[must_use]
    pub fn prepared_count(&self) -> usize {
        self.count_calls(|call| matches!(call, Call::Prepare(_)))
    }

    #[must_use]
    pub fn finalized_count(&self) -> usize {
        self.count_calls(|call| matches!(call, Call::Finalize(_)))
    }

    #[must_use]
    pub fn broker(&self) -> &EventBroker {
        &self.events
    }

    fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|call| pred(call)).count()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn complete(&self, sql: &str, script: &StatementScript) -> Result<(), SqlSyncError> {
        let keyword = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        let mut rollback = script.raises_rollback;
        {
            let mut state = self.state.borrow_mut();
            match keyword.as_str() {
                "BEGIN" if !state.autocommit => {
                    return Err(SqlSyncError::StepError(
                        "cannot start a transaction within a transaction".into(),
                    ));
                }
                "BEGIN" => state.autocommit = false,
                "COMMIT" | "END" if state.autocommit => {
                    return Err(SqlSyncError::StepError(
                        "cannot commit - no transaction is active".into(),
                    ));
                }
                "COMMIT" | "END" => state.autocommit = true,
                "ROLLBACK" => rollback = true,
                _ => {}
            }
            if let Some(changes) = script.changes {
                state.changes = changes;
            }
            if let Some(id) = script.insert_id {
                state.last_insert_rowid = id;
            }
            if rollback {
                state.autocommit = true;
            }
            state.completed.push(sql.to_owned());
        }
        if rollback {
            self.events.emit(DbEvent::Rollback);
        }
        Ok(())
    }
}

impl NativeDatabase for ScriptedDatabase {
    type Statement<'db> = ScriptedStatement<'db>;

    fn prepare<'db>(&'db self, sql: &str) -> Result<Option<ScriptedStatement<'db>>, SqlSyncError> {
        let mut rest = sql;
        loop {
            let (statement, tail) = rest.split_once(';').unwrap_or((rest, ""));
            let statement = statement.trim();
            if statement.is_empty() {
                if tail.is_empty() {
                    return Ok(None);
                }
                rest = tail;
                continue;
            }
            let script = self.scripts.get(statement).cloned().unwrap_or_default();
            if script.prepare_error {
                return Err(SqlSyncError::PrepareError(format!(
                    "near \"{statement}\": syntax error"
                )));
            }
            self.record(Call::Prepare(statement.to_owned()));
            return Ok(Some(ScriptedStatement {
                db: self,
                sql: statement.to_owned(),
                script,
                tail: tail.to_owned(),
                cursor: 0,
                done: false,
            }));
        }
    }

    fn changes(&self) -> i64 {
        self.state.borrow().changes
    }

    fn last_insert_rowid(&self) -> i64 {
        self.state.borrow().last_insert_rowid
    }

    fn is_autocommit(&self) -> bool {
        self.state.borrow().autocommit
    }

    fn events(&self) -> &dyn EventSource {
        &self.events
    }
}

/// Statement handed out by [`ScriptedDatabase::prepare`].
#[derive(Debug)]
pub struct ScriptedStatement<'db> {
    db: &'db ScriptedDatabase,
    sql: String,
    script: StatementScript,
    tail: String,
    cursor: usize,
    done: bool,
}

impl NativeStatement for ScriptedStatement<'_> {
    fn tail(&self) -> &str {
        &self.tail
    }

    fn bind_parameter_count(&self) -> usize {
        self.script.placeholders.len()
    }

    fn bind_index(&mut self, position: usize, value: &RowValues) -> Result<(), SqlSyncError> {
        if position == 0 || position > self.script.placeholders.len() {
            return Err(SqlSyncError::ParameterError(format!(
                "bind index {position} out of range"
            )));
        }
        self.db.record(Call::BindIndex(position, value.clone()));
        Ok(())
    }

    fn bind_name(&mut self, name: &str, value: &RowValues) -> Result<bool, SqlSyncError> {
        if self.script.placeholders.iter().any(|p| p == name) {
            self.db.record(Call::BindName(name.to_owned(), value.clone()));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn column_names(&self) -> Vec<String> {
        self.script.columns.clone()
    }

    fn step(&mut self) -> Result<Option<Vec<RowValues>>, SqlSyncError> {
        if self.script.fail_after == Some(self.cursor) {
            return Err(SqlSyncError::StepError(format!(
                "scripted failure in `{}` after {} rows",
                self.sql, self.cursor
            )));
        }
        if let Some(row) = self.script.rows.get(self.cursor) {
            self.cursor += 1;
            return Ok(Some(row.clone()));
        }
        if !self.done {
            self.done = true;
            self.db.complete(&self.sql, &self.script)?;
        }
        Ok(None)
    }

    fn finalize(self) -> Result<(), SqlSyncError> {
        self.db.record(Call::Finalize(self.sql));
        Ok(())
    }
}
