//! Table definitions

use crate::naming;
use crate::Result;

/// SQL to list user tables
pub const LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

/// One column of a table to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: &'static str,
    pub primary_key: bool,
    pub not_null: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: &'static str) -> Self {
        Self {
            name: name.into(),
            sql_type,
            primary_key: false,
            not_null: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Column definition as it appears inside `CREATE TABLE`
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// SQL to create a table if it does not exist yet
pub fn create_table_sql(table: &str, columns: &[ColumnDef]) -> Result<String> {
    let table = naming::sql_identifier(table)?;
    let mut definitions = Vec::with_capacity(columns.len());
    for column in columns {
        let column = ColumnDef {
            name: naming::sql_identifier(&column.name)?,
            ..column.clone()
        };
        definitions.push(column.to_sql());
    }
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table,
        definitions.join(", ")
    ))
}
