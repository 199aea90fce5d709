//! Relational persistence for frames.
//!
//! A [`TableSink`] owns one database connection for the whole run. The orchestrator only ever
//! talks to it through this trait; [`crate::tables::TableRegistry`] decides which table name a
//! frame goes to.
//!
//! Backends:
//! - [`sqlite::SqliteSink`]: file or in-memory SQLite (always available)
//! - [`postgres::PostgresSink`]: PostgreSQL (requires the Cargo feature `postgres`, on by default)

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod sqlite;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::IngestionResult;
use crate::types::{DataType, Frame, Schema, Value};

pub use sqlite::SqliteSink;

#[cfg(feature = "postgres")]
pub use postgres::PostgresSink;

/// Column layout of an existing table as reported by the database.
///
/// Column types the crate does not map are kept as `None`; such a column never accepts values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    pub columns: Vec<(String, Option<DataType>)>,
}

impl TableShape {
    /// Shape of a table created from `schema`.
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            columns: schema
                .fields
                .iter()
                .map(|f| (f.name.clone(), Some(f.data_type)))
                .collect(),
        }
    }

    /// True when rows of `frame` can be appended: the same column names in any order, where each
    /// column either has the table's type, holds integers bound for a float column, or is
    /// entirely null.
    pub fn accepts(&self, frame: &Frame) -> bool {
        if self.columns.len() != frame.schema.fields.len() {
            return false;
        }
        frame.schema.fields.iter().enumerate().all(|(idx, field)| {
            match self.column_type(&field.name) {
                Some(Some(table_type)) => {
                    table_type == field.data_type
                        || (field.data_type == DataType::Int64 && table_type == DataType::Float64)
                        || frame.rows.iter().all(|row| row[idx].is_null())
                }
                _ => false,
            }
        })
    }

    /// `frame` retyped to the table's column types, borrowed when nothing changes.
    ///
    /// Integers going into a float column become floats; all-null columns only change their
    /// declared type. Columns the table does not have are left alone.
    pub fn conform<'a>(&self, frame: &'a Frame) -> Cow<'a, Frame> {
        let retyped: Vec<(usize, DataType)> = frame
            .schema
            .fields
            .iter()
            .enumerate()
            .filter_map(|(idx, field)| match self.column_type(&field.name) {
                Some(Some(t)) if t != field.data_type => Some((idx, t)),
                _ => None,
            })
            .collect();
        if retyped.is_empty() {
            return Cow::Borrowed(frame);
        }

        let mut out = frame.clone();
        for (idx, table_type) in retyped {
            out.schema.fields[idx].data_type = table_type;
            if table_type == DataType::Float64 {
                for row in &mut out.rows {
                    if let Value::Int64(v) = row[idx] {
                        row[idx] = Value::Float64(v as f64);
                    }
                }
            }
        }
        Cow::Owned(out)
    }

    fn column_type(&self, name: &str) -> Option<Option<DataType>> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
    }
}

/// Persistence backend for frames.
pub trait TableSink {
    /// Short backend name for logs (`"sqlite"`, `"postgres"`).
    fn backend(&self) -> &'static str;

    /// Create the bookkeeping schema and query-history table if absent. Idempotent.
    fn ensure_history_table(&mut self) -> IngestionResult<()>;

    /// Column layout of `table`, or `None` if it does not exist.
    fn table_schema(&mut self, table: &str) -> IngestionResult<Option<TableShape>>;

    /// Create `table` with one column per field of `schema`.
    fn create_table(&mut self, table: &str, schema: &Schema) -> IngestionResult<()>;

    /// Insert every row of `frame` into `table` in one transaction; returns the row count.
    ///
    /// Columns are matched by name.
    fn append(&mut self, table: &str, frame: &Frame) -> IngestionResult<usize>;
}

/// Database connection parameters.
///
/// Loadable from a JSON settings file; missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub database: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            database: "hebse".to_string(),
            username: "postgres".to_string(),
            password: "root".to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl ConnectionSettings {
    /// Read settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> IngestionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Comma-separated quoted column names of `schema`.
pub fn column_list(schema: &Schema) -> String {
    schema
        .field_names()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE` statement for `schema`, using [`DataType::sql_name`] column types.
pub fn create_table_sql(table: &str, schema: &Schema) -> String {
    let columns = schema
        .fields
        .iter()
        .map(|f| format!("{} {}", quote_ident(&f.name), f.data_type.sql_name()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({columns})", quote_ident(table))
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::{create_table_sql, quote_ident, ConnectionSettings, TableShape};
    use crate::types::{DataType, Field, Frame, Schema, Value};

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("b \"x\"", DataType::Utf8),
        ])
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("run1"), "\"run1\"");
        assert_eq!(
            create_table_sql("t", &schema()),
            "CREATE TABLE \"t\" (\"a\" BIGINT, \"b \"\"x\"\"\" TEXT)"
        );
    }

    fn frame(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Frame {
        Frame::new(Schema::new(fields), rows)
    }

    #[test]
    fn shape_accepts_same_columns_in_any_order() {
        let shape = TableShape {
            columns: vec![
                ("b \"x\"".to_string(), Some(DataType::Utf8)),
                ("a".to_string(), Some(DataType::Int64)),
            ],
        };
        let same = frame(schema().fields, vec![vec![Value::Int64(1), Value::Utf8("s".into())]]);
        assert!(shape.accepts(&same));
        assert!(matches!(shape.conform(&same), Cow::Borrowed(_)));

        let narrower = frame(vec![Field::new("a", DataType::Int64)], vec![vec![Value::Int64(1)]]);
        assert!(!shape.accepts(&narrower));

        let floats = frame(
            vec![Field::new("a", DataType::Float64), Field::new("b \"x\"", DataType::Utf8)],
            vec![vec![Value::Float64(1.5), Value::Utf8("s".into())]],
        );
        assert!(!shape.accepts(&floats));
        assert!(TableShape::from_schema(&floats.schema).accepts(&floats));
    }

    #[test]
    fn integers_conform_to_float_columns() {
        let shape = TableShape {
            columns: vec![("a".to_string(), Some(DataType::Float64))],
        };
        let ints = frame(
            vec![Field::new("a", DataType::Int64)],
            vec![vec![Value::Int64(2)], vec![Value::Null]],
        );
        assert!(shape.accepts(&ints));

        let conformed = shape.conform(&ints);
        assert_eq!(conformed.schema.fields[0].data_type, DataType::Float64);
        assert_eq!(conformed.column(0), vec![Value::Float64(2.0), Value::Null]);
    }

    #[test]
    fn null_columns_fit_mapped_types_only() {
        let nulls = frame(vec![Field::new("a", DataType::Float64)], vec![vec![Value::Null]]);

        let text = TableShape {
            columns: vec![("a".to_string(), Some(DataType::Utf8))],
        };
        assert!(text.accepts(&nulls));
        assert_eq!(text.conform(&nulls).schema.fields[0].data_type, DataType::Utf8);

        let unmapped = TableShape {
            columns: vec![("a".to_string(), None)],
        };
        assert!(!unmapped.accepts(&nulls));
    }

    #[test]
    fn settings_fill_missing_keys_with_defaults() {
        let s: ConnectionSettings = serde_json::from_str(r#"{"database": "lab", "port": 6543}"#).unwrap();
        assert_eq!(s.database, "lab");
        assert_eq!(s.port, 6543);
        assert_eq!(s.username, "postgres");
        assert_eq!(s.host, "localhost");
    }
}
