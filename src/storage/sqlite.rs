//! SQLite storage implementation

use std::path::Path;
use rusqlite::{params_from_iter, Connection};
use crate::codec::Value;
use crate::naming;
use crate::predicate::Predicate;
use crate::Result;
use super::schema::{self, ColumnDef};
use super::{Row, RowStore};

/// SQLite-backed row storage
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Underlying connection, for callers that need plain SQL
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ========== Transactions ==========

    /// Begin a transaction
    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction
    pub fn rollback(&self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    // ========== Introspection ==========

    /// Names of all user tables
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(schema::LIST_TABLES)?;
        let tables = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tables)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let mut tables = Vec::new();
        for table in self.list_tables()? {
            let rows = self.count_rows(&table, None)?;
            tables.push((table, rows));
        }
        Ok(DbStats { tables })
    }

    fn where_clause(predicate: Option<&Predicate>, first: usize) -> Result<(String, Vec<Value>)> {
        match predicate {
            Some(predicate) => predicate.to_sql(first),
            None => Ok(("1".to_string(), Vec::new())),
        }
    }
}

impl RowStore for SqliteStore {
    fn create_table(&self, table: &str, columns: &[ColumnDef]) -> Result<()> {
        let sql = schema::create_table_sql(table, columns)?;
        tracing::debug!("{}", sql);
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn create_row(&self, table: &str, values: &[(String, Value)]) -> Result<i64> {
        let table = naming::sql_identifier(table)?;
        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            let columns = values
                .iter()
                .map(|(column, _)| naming::sql_identifier(column))
                .collect::<Result<Vec<_>>>()?;
            let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        tracing::debug!("{}", sql);
        self.conn.execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn query_rows(&self, table: &str, predicate: Option<&Predicate>, limit: Option<usize>) -> Result<Vec<Row>> {
        let table = naming::sql_identifier(table)?;
        let (condition, params) = Self::where_clause(predicate, 1)?;
        let mut sql = format!("SELECT * FROM {} WHERE {}", table, condition);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        self.raw_query(&sql, &params)
    }

    fn update_rows(&self, table: &str, values: &[(String, Value)], predicate: Option<&Predicate>) -> Result<usize> {
        if values.is_empty() {
            tracing::debug!("Nothing to update in {}", table);
            return Ok(0);
        }

        let table = naming::sql_identifier(table)?;
        let mut assignments = Vec::with_capacity(values.len());
        for (i, (column, _)) in values.iter().enumerate() {
            assignments.push(format!("{} = ?{}", naming::sql_identifier(column)?, i + 1));
        }
        let (condition, predicate_params) = Self::where_clause(predicate, values.len() + 1)?;
        let sql = format!("UPDATE {} SET {} WHERE {}", table, assignments.join(", "), condition);

        let params: Vec<&Value> = values
            .iter()
            .map(|(_, v)| v)
            .chain(predicate_params.iter())
            .collect();

        tracing::debug!("{}", sql);
        Ok(self.conn.execute(&sql, params_from_iter(params))?)
    }

    fn delete_rows(&self, table: &str, predicate: Option<&Predicate>) -> Result<usize> {
        let table = naming::sql_identifier(table)?;
        let (condition, params) = Self::where_clause(predicate, 1)?;
        let sql = format!("DELETE FROM {} WHERE {}", table, condition);
        tracing::debug!("{}", sql);
        Ok(self.conn.execute(&sql, params_from_iter(params.iter()))?)
    }

    fn count_rows(&self, table: &str, predicate: Option<&Predicate>) -> Result<usize> {
        let table = naming::sql_identifier(table)?;
        let (condition, params) = Self::where_clause(predicate, 1)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", table, condition);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn raw_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::debug!("{}", sql);
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..columns.len())
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .map(|values| values.map(|values| Row::new(columns.clone(), values)))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    /// Table name and row count, ordered by name
    pub tables: Vec<(String, usize)>,
}

impl DbStats {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, rows) in &self.tables {
            writeln!(f, "  {}: {}", table, rows)?;
        }
        write!(f, "  Total rows: {}", self.total_rows())
    }
}
