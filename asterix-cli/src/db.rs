//! SQLite export: one table per dataset, one column per export column.
//!
//! Columns are declared without a type so each cell keeps the storage class
//! of its value (INTEGER, REAL, TEXT or NULL). Re-exporting a dataset
//! replaces its table.

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Result as SqlResult, Transaction};

use asterix_core::export::{ExportSink, FieldValue};
use asterix_core::types::{AsterixError, Result};

/// SQLite database holding exported datasets.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &str) -> SqlResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = Path::new(path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let conn = Connection::open(path)?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn
        };
        Ok(Database { conn })
    }

    /// Open in-memory database (for testing).
    #[cfg(test)]
    pub fn open_memory() -> SqlResult<Self> {
        Self::open(":memory:")
    }

    /// Sink writing into `table` inside its own transaction. The table is
    /// replaced on `write_header`; nothing is kept unless `finish` commits.
    pub fn sink(&mut self, table: &str) -> Result<SqliteSink<'_>> {
        let tx = self.conn.transaction().map_err(sql_err)?;
        Ok(SqliteSink {
            tx: Some(tx),
            table: table_name(table),
            insert_sql: None,
        })
    }

    #[cfg(test)]
    pub fn count_rows(&self, table: &str) -> SqlResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&table_name(table)));
        self.conn.query_row(&sql, [], |r| r.get(0))
    }

    /// Names of all user tables, sorted.
    #[cfg(test)]
    pub fn tables(&self) -> SqlResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let rows = stmt.query_map([], |r| r.get(0))?;
        rows.collect()
    }
}

/// Map an arbitrary dataset name onto `[A-Za-z0-9_]`.
pub fn table_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn sql_err(e: rusqlite::Error) -> AsterixError {
    AsterixError::Export(e.to_string())
}

fn to_sql(value: &Option<FieldValue>) -> Value {
    match value {
        None => Value::Null,
        Some(FieldValue::Int(v)) => Value::Integer(*v),
        Some(FieldValue::Float(v)) => Value::Real(*v),
        Some(FieldValue::Text(v)) => Value::Text(v.clone()),
        Some(v @ (FieldValue::Time(_) | FieldValue::DateTime(_))) => Value::Text(v.to_string()),
    }
}

/// Writes one dataset inside a single transaction. Dropping the sink
/// before `finish`, or after a failed write, rolls the dataset back.
pub struct SqliteSink<'c> {
    tx: Option<Transaction<'c>>,
    table: String,
    insert_sql: Option<String>,
}

impl SqliteSink<'_> {
    fn tx(&self) -> Result<&Transaction<'_>> {
        self.tx
            .as_ref()
            .ok_or_else(|| AsterixError::Export("sink already finished".into()))
    }
}

impl ExportSink for SqliteSink<'_> {
    fn write_header(&mut self, columns: &[&str]) -> Result<()> {
        let table = quote_ident(&self.table);
        let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");

        self.tx()?
            .execute_batch(&format!(
                "DROP TABLE IF EXISTS {table};
                 CREATE TABLE {table} ({});",
                cols.join(", ")
            ))
            .map_err(sql_err)?;
        self.insert_sql = Some(format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            cols.join(", ")
        ));
        Ok(())
    }

    fn write_row(&mut self, row: &[Option<FieldValue>]) -> Result<()> {
        let sql = self
            .insert_sql
            .as_deref()
            .ok_or_else(|| AsterixError::Export("row written before header".into()))?;
        let mut stmt = self.tx()?.prepare_cached(sql).map_err(sql_err)?;
        stmt.execute(params_from_iter(row.iter().map(to_sql)))
            .map_err(sql_err)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.insert_sql = None;
        if let Some(tx) = self.tx.take() {
            tx.commit().map_err(sql_err)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
