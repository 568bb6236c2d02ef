use tabled::{builder::Builder, settings::Style, Table, Tabled};
use crate::storage::{DbStats, Row};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

/// Row counts per table
pub fn stats_table(stats: &DbStats) -> String {
    if stats.tables.is_empty() {
        return String::new();
    }

    let rows: Vec<TableRow> = stats
        .tables
        .iter()
        .map(|(table, rows)| TableRow {
            table: table.clone(),
            rows: *rows,
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}

/// Stored rows under a header of their column names
pub fn rows_table(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let mut builder = Builder::default();
    builder.push_record(first.columns().iter().cloned());
    for row in rows {
        builder.push_record(row.values().iter().map(|v| v.to_string()));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;

    #[test]
    fn test_stats_table_lists_tables() {
        let stats = DbStats {
            tables: vec![("hero".into(), 3), ("team".into(), 1)],
        };
        let rendered = stats_table(&stats);
        assert!(rendered.contains("hero"));
        assert!(rendered.contains("Rows"));
    }

    #[test]
    fn test_rows_table() {
        assert!(rows_table(&[]).is_empty());

        let rows = vec![Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Integer(7), Value::Text("Deadpond".into())],
        )];
        let rendered = rows_table(&rows);
        assert!(rendered.contains("name"));
        assert!(rendered.contains("Deadpond"));
    }
}
