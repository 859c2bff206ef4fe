mod result_set;
mod row;

pub use result_set::{QueryResult, ResultCollection, ResultSet, RowsView};
pub use row::CustomDbRow;
