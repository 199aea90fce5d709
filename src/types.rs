//! Core data model types for ingestion.
//!
//! Containers yield raw [`Datum`] elements; the processing stages turn them into a typed,
//! row-major [`Frame`] described by a [`Schema`] (a list of typed [`Field`]s).

use std::fmt;

/// Logical data type for a frame column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// SQL column type used when a table is created for this type.
    pub fn sql_name(self) -> &'static str {
        match self {
            DataType::Int64 => "BIGINT",
            DataType::Float64 => "DOUBLE PRECISION",
            DataType::Bool => "BOOLEAN",
            DataType::Utf8 => "TEXT",
        }
    }

    /// Map a column type reported by a database back to a logical type (case-insensitive).
    ///
    /// Accepts the names produced by [`Self::sql_name`] plus the usual aliases reported by
    /// PostgreSQL's `information_schema` and SQLite's `PRAGMA table_info`.
    pub fn from_sql_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bigint" | "int8" | "integer" | "int" | "int4" | "smallint" | "int2" => Some(Self::Int64),
            "double precision" | "float8" | "double" | "real" | "float4" | "float" | "numeric" => {
                Some(Self::Float64)
            }
            "boolean" | "bool" => Some(Self::Bool),
            "text" | "varchar" | "character varying" | "char" | "character" => Some(Self::Utf8),
            _ => None,
        }
    }

    /// Whether the imputer interpolates this type.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }
}

/// A single named, typed column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Column data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of columns describing a [`Frame`] or an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed cell in a [`Frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/absent value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float (never NaN; NaN is stored as [`Value::Null`]).
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell, if it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

/// Raw element read from a container, before sanitization and typing.
///
/// Sanitization removes [`Datum::Bytes`] and [`Datum::Record`]; every other variant survives it.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// Absent value (`null`, or a NaN float).
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Byte string (fixed-length HDF5 strings, opaque blobs).
    Bytes(Vec<u8>),
    /// Opaque structured scalar: the field values of one compound element.
    Record(Vec<Datum>),
    /// Ordered tuple of fields, the sanitized form of a [`Datum::Record`].
    Tuple(Vec<Datum>),
    /// Nested sequence (fixed arrays inside an element, ragged rows).
    Sequence(Vec<Datum>),
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Missing => f.write_str("null"),
            Datum::Bool(v) => write!(f, "{v}"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Float(v) => write!(f, "{v}"),
            Datum::Text(v) => f.write_str(v),
            Datum::Bytes(v) => {
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Datum::Record(items) | Datum::Tuple(items) => write_joined(f, "(", items, ")"),
            Datum::Sequence(items) => write_joined(f, "[", items, "]"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, open: &str, items: &[Datum], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

/// Axis along which neighbouring values of a frame belong to the same series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesAxis {
    /// Each column is a series, ordered by row.
    #[default]
    Rows,
    /// The single row is one series, ordered by column (a rank-1 vector laid out as a row).
    Columns,
}

/// In-memory tabular frame produced from one leaf node.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
    /// How values relate for interpolation.
    pub series_axis: SeriesAxis,
}

impl Frame {
    /// Create a frame from schema and rows; every column is its own series.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self {
            schema,
            rows,
            series_axis: SeriesAxis::Rows,
        }
    }

    /// Same frame with `axis` as its series axis.
    pub fn with_series_axis(mut self, axis: SeriesAxis) -> Self {
        self.series_axis = axis;
        self
    }

    /// Number of rows in the frame.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the frame.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Copy out one column, top to bottom.
    pub fn column(&self, idx: usize) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Whether any cell is absent.
    pub fn has_missing(&self) -> bool {
        self.rows.iter().flatten().any(Value::is_null)
    }

    /// Set `name` to `value` on every row, appending the column if it does not exist yet.
    ///
    /// An existing column of the same name is overwritten (and retyped).
    pub fn set_constant_column(&mut self, name: &str, value: Value, data_type: DataType) {
        match self.schema.index_of(name) {
            Some(idx) => {
                self.schema.fields[idx].data_type = data_type;
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.schema.fields.push(Field::new(name, data_type));
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataType, Datum, Field, Frame, Schema, Value};

    #[test]
    fn sql_names_round_trip_through_aliases() {
        for t in [DataType::Int64, DataType::Float64, DataType::Bool, DataType::Utf8] {
            assert_eq!(DataType::from_sql_name(t.sql_name()), Some(t));
        }
        assert_eq!(DataType::from_sql_name("INTEGER"), Some(DataType::Int64));
        assert_eq!(DataType::from_sql_name("bytea"), None);
    }

    #[test]
    fn constant_column_overwrites_existing() {
        let mut frame = Frame::new(
            Schema::new(vec![Field::new("run_number", DataType::Utf8)]),
            vec![vec![Value::Utf8("x".into())], vec![Value::Null]],
        );
        frame.set_constant_column("run_number", Value::Int64(4), DataType::Int64);
        assert_eq!(frame.column_count(), 1);
        assert_eq!(frame.schema.fields[0].data_type, DataType::Int64);
        assert_eq!(frame.column(0), vec![Value::Int64(4), Value::Int64(4)]);
    }

    #[test]
    fn datum_display_renders_nested_values() {
        let d = Datum::Tuple(vec![
            Datum::Int(1),
            Datum::Text("a".into()),
            Datum::Sequence(vec![Datum::Float(0.5), Datum::Missing]),
        ]);
        assert_eq!(d.to_string(), "(1, a, [0.5, null])");
    }
}
