//! Storage Layer - row-level persistence
//!
//! The engine only needs a handful of row primitives, described by
//! [`RowStore`]. [`SqliteStore`] implements them on a SQLite connection.

pub mod schema;
pub mod sqlite;

pub use schema::ColumnDef;
pub use sqlite::{SqliteStore, DbStats};

use serde::ser::{Serialize, SerializeMap, Serializer};
use crate::codec::Value;
use crate::predicate::Predicate;
use crate::Result;

/// A row read from storage: column names paired with values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Value of a column, `None` if the row has no such column or no value for it
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Row-storage primitives consumed by the persistence engine.
///
/// Table and column names arrive already normalized. A `None` predicate
/// matches every row.
pub trait RowStore {
    /// Create a table if it does not exist
    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> Result<()>;

    /// Write one row and return its identity
    fn create_row(&self, table: &str, values: &[(String, Value)]) -> Result<i64>;

    /// Read rows matching a predicate, up to `limit`
    fn query_rows(&self, table: &str, predicate: Option<&Predicate>, limit: Option<usize>) -> Result<Vec<Row>>;

    /// Overwrite columns on matching rows, returning the affected count.
    ///
    /// With no values nothing is written and the count is 0, whether or not
    /// rows match.
    fn update_rows(&self, table: &str, values: &[(String, Value)], predicate: Option<&Predicate>) -> Result<usize>;

    /// Remove matching rows, returning the affected count
    fn delete_rows(&self, table: &str, predicate: Option<&Predicate>) -> Result<usize>;

    /// Count matching rows
    fn count_rows(&self, table: &str, predicate: Option<&Predicate>) -> Result<usize>;

    /// Run a read-only statement with positional parameters
    fn raw_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_and_json() {
        let row = Row::new(
            vec!["id".into(), "name".into(), "note".into()],
            vec![Value::Integer(1), Value::Text("ada".into()), Value::Null],
        );
        assert_eq!(row.get_column("name"), Some(&Value::Text("ada".into())));
        assert_eq!(row.get_column("missing"), None);

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1, "name": "ada", "note": null}));
    }

    #[test]
    fn test_column_without_value_is_absent() {
        let row = Row::new(vec!["id".into(), "name".into()], vec![Value::Integer(1)]);
        assert_eq!(row.get_column("id"), Some(&Value::Integer(1)));
        assert_eq!(row.get_column("name"), None);
        assert_eq!(row.iter().count(), 1);
    }
}
