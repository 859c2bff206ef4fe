use std::collections::VecDeque;

use rusqlite::types::Value;

use super::params::{row_value_to_sqlite_value, sqlite_value_to_row_value};
use crate::driver::NativeStatement;
use crate::error::SqlSyncError;
use crate::types::RowValues;

/// One prepared `SQLite` statement plus the SQL that followed it.
///
/// `rusqlite` hands out rows through a cursor that borrows the statement, so the
/// first [`NativeStatement::step`] runs the statement to completion and later
/// steps drain the buffered rows.
pub struct SqliteStatement<'conn> {
    stmt: rusqlite::Statement<'conn>,
    tail: String,
    pending: Option<VecDeque<Vec<RowValues>>>,
}

impl<'conn> SqliteStatement<'conn> {
    pub(crate) fn new(stmt: rusqlite::Statement<'conn>, tail: String) -> Self {
        Self {
            stmt,
            tail,
            pending: None,
        }
    }

    fn execute_into_buffer(&mut self) -> Result<VecDeque<Vec<RowValues>>, rusqlite::Error> {
        let column_count = self.stmt.column_count();
        let mut buffered = VecDeque::new();
        let mut rows = self.stmt.raw_query();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                let value: Value = row.get(idx)?;
                values.push(sqlite_value_to_row_value(value));
            }
            buffered.push_back(values);
        }
        Ok(buffered)
    }
}

impl NativeStatement for SqliteStatement<'_> {
    fn tail(&self) -> &str {
        &self.tail
    }

    fn bind_parameter_count(&self) -> usize {
        self.stmt.parameter_count()
    }

    fn bind_index(&mut self, position: usize, value: &RowValues) -> Result<(), SqlSyncError> {
        self.stmt
            .raw_bind_parameter(position, row_value_to_sqlite_value(value))
            .map_err(|e| SqlSyncError::ParameterError(format!("position {position}: {e}")))
    }

    fn bind_name(&mut self, name: &str, value: &RowValues) -> Result<bool, SqlSyncError> {
        let index = self
            .stmt
            .parameter_index(name)
            .map_err(|e| SqlSyncError::ParameterError(format!("{name}: {e}")))?;
        match index {
            Some(position) => {
                self.bind_index(position, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn column_names(&self) -> Vec<String> {
        self.stmt
            .column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect()
    }

    fn step(&mut self) -> Result<Option<Vec<RowValues>>, SqlSyncError> {
        if self.pending.is_none() {
            let buffered = self
                .execute_into_buffer()
                .map_err(|e| SqlSyncError::StepError(e.to_string()))?;
            self.pending = Some(buffered);
        }
        Ok(self.pending.as_mut().and_then(VecDeque::pop_front))
    }

    fn finalize(self) -> Result<(), SqlSyncError> {
        self.stmt
            .finalize()
            .map_err(|e| SqlSyncError::FinalizeError(e.to_string()))
    }
}
