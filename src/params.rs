use std::collections::{BTreeMap, VecDeque};

use crate::driver::NativeStatement;
use crate::error::SqlSyncError;
use crate::types::RowValues;

/// Placeholder prefixes tried, in order, for a bare mapping key.
const NAMED_PREFIXES: [char; 3] = [':', '@', '$'];

/// Ordered parameter queue shared by every statement of one query.
///
/// Each statement takes as many values from the front as it has placeholders,
/// so a queue is spent once a query has run:
/// ```rust
/// use sql_sync::prelude::*;
///
/// let mut params = PositionalParams::from(vec![RowValues::Int(1), RowValues::Int(2)]);
/// let first = params.take_prefix(1)?;
/// assert_eq!(first, vec![RowValues::Int(1)]);
/// assert_eq!(params.remaining(), 1);
/// # Ok::<(), SqlSyncError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionalParams {
    values: VecDeque<RowValues>,
}

impl PositionalParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: impl Into<RowValues>) {
        self.values.push_back(value.into());
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove and return the first `count` values.
    ///
    /// Nothing is consumed when fewer than `count` values remain.
    ///
    /// # Errors
    /// Returns [`SqlSyncError::ParameterCountMismatch`] if the queue is too short.
    pub fn take_prefix(&mut self, count: usize) -> Result<Vec<RowValues>, SqlSyncError> {
        if count > self.values.len() {
            return Err(SqlSyncError::ParameterCountMismatch {
                needed: count,
                remaining: self.values.len(),
            });
        }
        Ok(self.values.drain(..count).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowValues> {
        self.values.iter()
    }
}

impl From<Vec<RowValues>> for PositionalParams {
    fn from(values: Vec<RowValues>) -> Self {
        Self {
            values: values.into(),
        }
    }
}

impl FromIterator<RowValues> for PositionalParams {
    fn from_iter<I: IntoIterator<Item = RowValues>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Name → value mapping rebound in full for every statement of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    values: BTreeMap<String, RowValues>,
}

impl NamedParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value. `name` may carry its prefix (`:id`) or be bare (`id`).
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Option<RowValues> {
        self.values.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        self.values.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<RowValues>> FromIterator<(K, V)> for NamedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Where the values for a query's placeholders come from.
#[derive(Debug, Default)]
pub enum ParamSource<'p> {
    /// Statements run with their placeholders unbound.
    #[default]
    None,
    /// Shared queue, consumed left to right across statements.
    Positional(&'p mut PositionalParams),
    /// Mapping bound to every statement, never modified.
    Named(&'p NamedParams),
}

impl<'p> From<&'p mut PositionalParams> for ParamSource<'p> {
    fn from(params: &'p mut PositionalParams) -> Self {
        ParamSource::Positional(params)
    }
}

impl<'p> From<&'p NamedParams> for ParamSource<'p> {
    fn from(params: &'p NamedParams) -> Self {
        ParamSource::Named(params)
    }
}

impl ParamSource<'_> {
    /// Bind this source to `statement`.
    ///
    /// # Errors
    /// Returns [`SqlSyncError::ParameterCountMismatch`] when the positional queue is
    /// shorter than the statement's placeholder count, or any binding error raised by
    /// the driver.
    pub fn bind<S: NativeStatement + ?Sized>(&mut self, statement: &mut S) -> Result<(), SqlSyncError> {
        match self {
            ParamSource::None => Ok(()),
            ParamSource::Positional(queue) => bind_positional(statement, queue),
            ParamSource::Named(mapping) => bind_named(statement, mapping),
        }
    }
}

fn bind_positional<S: NativeStatement + ?Sized>(
    statement: &mut S,
    queue: &mut PositionalParams,
) -> Result<(), SqlSyncError> {
    let needed = statement.bind_parameter_count();
    let values = queue.take_prefix(needed)?;
    for (offset, value) in values.iter().enumerate() {
        tracing::trace!(position = offset + 1, ?value, "binding positional parameter");
        statement.bind_index(offset + 1, value)?;
    }
    Ok(())
}

fn bind_named<S: NativeStatement + ?Sized>(
    statement: &mut S,
    mapping: &NamedParams,
) -> Result<(), SqlSyncError> {
    for (name, value) in mapping.iter() {
        let bound = if name.starts_with(NAMED_PREFIXES) || name.starts_with('?') {
            statement.bind_name(name, value)?
        } else {
            let mut bound = false;
            for prefix in NAMED_PREFIXES {
                if statement.bind_name(&format!("{prefix}{name}"), value)? {
                    bound = true;
                    break;
                }
            }
            bound
        };
        if bound {
            tracing::trace!(name, ?value, "bound named parameter");
        } else {
            tracing::trace!(name, "statement has no placeholder for named parameter");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        placeholders: Vec<String>,
        positional: Vec<(usize, RowValues)>,
        named: Vec<(String, RowValues)>,
    }

    impl NativeStatement for Recorder {
        fn tail(&self) -> &str {
            ""
        }

        fn bind_parameter_count(&self) -> usize {
            self.placeholders.len()
        }

        fn bind_index(&mut self, position: usize, value: &RowValues) -> Result<(), SqlSyncError> {
            self.positional.push((position, value.clone()));
            Ok(())
        }

        fn bind_name(&mut self, name: &str, value: &RowValues) -> Result<bool, SqlSyncError> {
            if self.placeholders.iter().any(|p| p == name) {
                self.named.push((name.to_owned(), value.clone()));
                Ok(true)
            } else {
                Ok(false)
            }
        }

        fn column_names(&self) -> Vec<String> {
            Vec::new()
        }

        fn step(&mut self) -> Result<Option<Vec<RowValues>>, SqlSyncError> {
            Ok(None)
        }

        fn finalize(self) -> Result<(), SqlSyncError> {
            Ok(())
        }
    }

    fn recorder(placeholders: &[&str]) -> Recorder {
        Recorder {
            placeholders: placeholders.iter().map(|p| (*p).to_owned()).collect(),
            ..Recorder::default()
        }
    }

    #[test]
    fn positional_binds_prefix_in_order() {
        let mut queue: PositionalParams = (1..=3).map(RowValues::Int).collect();
        let mut stmt = recorder(&["?1", "?2"]);

        ParamSource::from(&mut queue).bind(&mut stmt).unwrap();

        assert_eq!(
            stmt.positional,
            vec![(1, RowValues::Int(1)), (2, RowValues::Int(2))]
        );
        assert_eq!(queue.iter().cloned().collect::<Vec<_>>(), vec![RowValues::Int(3)]);
    }

    #[test]
    fn positional_shortfall_consumes_nothing() {
        let mut queue = PositionalParams::from(vec![RowValues::Int(1)]);
        let mut stmt = recorder(&["?1", "?2"]);

        let err = ParamSource::from(&mut queue).bind(&mut stmt).unwrap_err();

        assert!(matches!(
            err,
            SqlSyncError::ParameterCountMismatch {
                needed: 2,
                remaining: 1
            }
        ));
        assert_eq!(queue.remaining(), 1);
        assert!(stmt.positional.is_empty());
    }

    #[test]
    fn named_resolves_bare_keys_against_prefixes() {
        let mapping = NamedParams::new()
            .with("id", 7_i64)
            .with("@who", "bob")
            .with("unused", 0_i64);
        let mut stmt = recorder(&["$id", "@who"]);

        ParamSource::from(&mapping).bind(&mut stmt).unwrap();

        assert_eq!(
            stmt.named,
            vec![
                ("@who".to_owned(), RowValues::Text("bob".into())),
                ("$id".to_owned(), RowValues::Int(7)),
            ]
        );
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn none_source_binds_nothing() {
        let mut stmt = recorder(&["?1"]);
        ParamSource::None.bind(&mut stmt).unwrap();
        assert!(stmt.positional.is_empty());
    }
}
