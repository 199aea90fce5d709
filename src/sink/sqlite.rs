//! SQLite sink.

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use crate::error::IngestionResult;
use crate::types::{DataType, Frame, Schema, Value};

use super::{column_list, create_table_sql, quote_ident, TableShape, TableSink};

/// SQLite has no schemas, so the bookkeeping table lives next to the data tables under a name that
/// cannot collide with the `history` data table.
pub const HISTORY_TABLE: &str = "history_completed_queries";

/// A SQLite database file (or in-memory database) used as the ingestion target.
#[derive(Debug)]
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> IngestionResult<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> IngestionResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Underlying connection, e.g. for reading results back.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TableSink for SqliteSink {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn ensure_history_table(&mut self) -> IngestionResult<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {HISTORY_TABLE} (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             query_sql TEXT, \
             time TIMESTAMP DEFAULT CURRENT_TIMESTAMP)"
        ))?;
        Ok(())
    }

    fn table_schema(&mut self, table: &str) -> IngestionResult<Option<TableShape>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let ty: String = row.get(1)?;
                Ok((name, DataType::from_sql_name(&ty)))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(if columns.is_empty() {
            None
        } else {
            Some(TableShape { columns })
        })
    }

    fn create_table(&mut self, table: &str, schema: &Schema) -> IngestionResult<()> {
        self.conn.execute_batch(&create_table_sql(table, schema))?;
        Ok(())
    }

    fn append(&mut self, table: &str, frame: &Frame) -> IngestionResult<usize> {
        let sql = insert_sql(table, &frame.schema);
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in &frame.rows {
                stmt.execute(params_from_iter(row.iter().map(sql_value)))?;
            }
        }
        tx.commit()?;
        Ok(frame.row_count())
    }
}

fn insert_sql(table: &str, schema: &Schema) -> String {
    let placeholders = vec!["?"; schema.fields.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_ident(table),
        column_list(schema)
    )
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int64(v) => SqlValue::Integer(*v),
        Value::Float64(v) => SqlValue::Real(*v),
        Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
        Value::Utf8(v) => SqlValue::Text(v.clone()),
    }
}
