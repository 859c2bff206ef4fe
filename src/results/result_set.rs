use std::collections::HashMap;
use std::ops::{Deref, Index};
use std::sync::{Arc, Weak};

use super::row::{CustomDbRow, index_columns};
use crate::types::RowValues;

/// Rows produced by one statement plus the handle counters read right after it ran.
///
/// Every result set of a query points back (weakly) at the [`ResultCollection`]
/// holding all of them; see [`ResultSet::all`].
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the statement, in driver order
    pub results: Vec<CustomDbRow>,
    /// The handle's change counter after the statement ran
    pub rows_affected: i64,
    /// The handle's last inserted row id after the statement ran
    pub insert_id: i64,
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Option<Arc<HashMap<String, usize>>>,
    all: Weak<ResultCollection>,
}

impl ResultSet {
    /// Create a new result set with a known row capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Set the column names for this result set (shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Append a row built from `row_values`, sharing this set's column names.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let column_names = self
            .column_names
            .get_or_insert_with(|| Arc::new(Vec::new()))
            .clone();
        let cache = self
            .column_index_cache
            .get_or_insert_with(|| Arc::new(index_columns(&column_names)))
            .clone();
        self.results
            .push(CustomDbRow::with_cache(column_names, cache, row_values));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustomDbRow> {
        self.results.iter()
    }

    /// Position-addressable, length-bearing view over the rows.
    #[must_use]
    pub fn rows(&self) -> RowsView<'_> {
        RowsView {
            rows: &self.results,
        }
    }

    /// The full collection this set belongs to.
    ///
    /// `None` for a set that was never part of a query result, or once every
    /// [`QueryResult`] for its query has been dropped.
    #[must_use]
    pub fn all(&self) -> Option<Arc<ResultCollection>> {
        self.all.upgrade()
    }

    pub(crate) fn attach(mut self, all: Weak<ResultCollection>) -> Self {
        self.all = all;
        self
    }
}

impl Index<usize> for ResultSet {
    type Output = CustomDbRow;

    fn index(&self, index: usize) -> &Self::Output {
        &self.results[index]
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a CustomDbRow;
    type IntoIter = std::slice::Iter<'a, CustomDbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Borrowed view used for item-by-position access.
#[derive(Debug, Clone, Copy)]
pub struct RowsView<'a> {
    rows: &'a [CustomDbRow],
}

impl<'a> RowsView<'a> {
    #[must_use]
    pub fn item(&self, index: usize) -> Option<&'a CustomDbRow> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every result set produced by one multi-statement query, in statement order.
#[derive(Debug, Default)]
pub struct ResultCollection {
    sets: Vec<ResultSet>,
}

impl ResultCollection {
    /// Share `sets` and point each of them back at the shared collection.
    pub(crate) fn link(sets: Vec<ResultSet>) -> Arc<ResultCollection> {
        Arc::new_cyclic(|weak| ResultCollection {
            sets: sets
                .into_iter()
                .map(|set| set.attach(weak.clone()))
                .collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ResultSet> {
        self.sets.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ResultSet] {
        &self.sets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultSet> {
        self.sets.iter()
    }
}

impl Index<usize> for ResultCollection {
    type Output = ResultSet;

    fn index(&self, index: usize) -> &Self::Output {
        &self.sets[index]
    }
}

/// What a query hands back: the first result set, with the rest reachable via [`QueryResult::all`].
///
/// Derefs to the primary [`ResultSet`].
#[derive(Debug, Clone)]
pub struct QueryResult {
    collection: Arc<ResultCollection>,
}

impl QueryResult {
    /// Wrap a collection; `None` when it holds no result sets.
    pub(crate) fn from_collection(collection: Arc<ResultCollection>) -> Option<Self> {
        if collection.is_empty() {
            None
        } else {
            Some(Self { collection })
        }
    }

    #[must_use]
    pub fn primary(&self) -> &ResultSet {
        &self.collection.sets[0]
    }

    #[must_use]
    pub fn all(&self) -> &ResultCollection {
        &self.collection
    }

    #[must_use]
    pub fn into_collection(self) -> Arc<ResultCollection> {
        self.collection
    }
}

impl Deref for QueryResult {
    type Target = ResultSet;

    fn deref(&self) -> &Self::Target {
        self.primary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(rows: &[i64], insert_id: i64) -> ResultSet {
        let mut set = ResultSet::with_capacity(rows.len());
        set.set_column_names(Arc::new(vec!["n".to_string()]));
        for n in rows {
            set.add_row_values(vec![RowValues::Int(*n)]);
        }
        set.insert_id = insert_id;
        set
    }

    #[test]
    fn empty_collection_has_no_primary() {
        assert!(QueryResult::from_collection(ResultCollection::link(Vec::new())).is_none());
    }

    #[test]
    fn primary_is_first_and_back_references_resolve() {
        let result = QueryResult::from_collection(ResultCollection::link(vec![
            set_with(&[1, 2], 0),
            set_with(&[], 5),
        ]))
        .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result.rows().item(1).unwrap().get("n"), Some(&RowValues::Int(2)));
        assert!(result.rows().item(2).is_none());

        let second = &result.all()[1];
        let all = second.all().expect("collection alive");
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].insert_id, 5);
        assert!(Arc::ptr_eq(&all, &result.clone().into_collection()));
    }

    #[test]
    fn back_reference_does_not_keep_collection_alive() {
        let result = QueryResult::from_collection(ResultCollection::link(vec![set_with(&[1], 0)]))
            .unwrap();
        let detached = result.primary().clone();
        drop(result);
        assert!(detached.all().is_none());
        assert_eq!(detached[0].get_by_index(0), Some(&RowValues::Int(1)));
    }
}
