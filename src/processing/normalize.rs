//! Raw array to [`Frame`] normalization.
//!
//! Every leaf is classified once into an [`ArrayLayout`] and turned into rows with a single
//! match:
//!
//! | layout       | rows                     | columns                       |
//! |--------------|--------------------------|-------------------------------|
//! | `Structured` | one per element          | one per named field           |
//! | `Scalar`     | 1                        | 1                             |
//! | `Rank1`      | 1                        | one per element               |
//! | `Rank2`      | first axis               | second axis                   |
//! | `RankN`      | one per element          | 1 (everything flattened)      |
//!
//! Column names: structured arrays use their field names. Other layouts use `Column_1..N`,
//! renamed positionally by an explicit column-name attribute when the leaf has one (a shorter
//! list renames only the leading columns). A single column without explicit names is named
//! after the leaf.

use std::collections::HashSet;

use crate::container::{base_name, LeafNode, RawArray};
use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataType, Datum, Field, Frame, Schema, SeriesAxis, Value};

use super::sanitize::sanitize_all;

/// Shape class of a raw array, resolved once per leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayLayout {
    Scalar(Datum),
    Structured { fields: Vec<String>, records: Vec<Vec<Datum>> },
    Rank1(Vec<Datum>),
    Rank2 { columns: usize, cells: Vec<Datum> },
    /// Rank >= 3 or irregular: all elements, flattened.
    RankN(Vec<Datum>),
}

impl ArrayLayout {
    /// Classify and sanitize `array`.
    pub fn classify(path: &str, array: RawArray) -> IngestionResult<Self> {
        let expected: usize = array.shape.iter().product();
        if array.elements.len() != expected {
            return Err(normalize_error(
                path,
                format!("shape {:?} needs {expected} elements, found {}", array.shape, array.elements.len()),
            ));
        }

        if let Some(fields) = array.fields {
            let mut records = Vec::with_capacity(array.elements.len());
            for element in array.elements {
                match element {
                    Datum::Record(values) if values.len() == fields.len() => records.push(sanitize_all(values)),
                    other => {
                        return Err(normalize_error(
                            path,
                            format!("expected a record of {} fields, found {other}", fields.len()),
                        ));
                    }
                }
            }
            return Ok(Self::Structured { fields, records });
        }

        let elements = sanitize_all(array.elements);
        Ok(match array.shape.len() {
            0 => Self::Scalar(elements.into_iter().next().unwrap_or(Datum::Missing)),
            1 if elements.iter().any(|e| matches!(e, Datum::Sequence(_))) => Self::RankN(flatten(elements)),
            1 => Self::Rank1(elements),
            2 => Self::Rank2 {
                columns: array.shape[1],
                cells: elements,
            },
            _ => Self::RankN(flatten(elements)),
        })
    }
}

fn flatten(elements: Vec<Datum>) -> Vec<Datum> {
    let mut out = Vec::with_capacity(elements.len());
    for e in elements {
        match e {
            Datum::Sequence(items) => out.extend(flatten(items)),
            other => out.push(other),
        }
    }
    out
}

/// Turn one leaf into a typed frame.
pub fn normalize(leaf: LeafNode) -> IngestionResult<Frame> {
    let LeafNode { path, array } = leaf;
    let explicit_names = array.column_names.clone();
    let layout = ArrayLayout::classify(&path, array)?;

    let axis = match layout {
        ArrayLayout::Rank1(_) => SeriesAxis::Columns,
        _ => SeriesAxis::Rows,
    };
    let (names, rows) = match layout {
        ArrayLayout::Structured { fields, records } => (fields, records),
        ArrayLayout::Scalar(value) => (column_names(&path, 1, explicit_names), vec![vec![value]]),
        ArrayLayout::Rank1(values) => (column_names(&path, values.len(), explicit_names), vec![values]),
        ArrayLayout::Rank2 { columns, cells } => {
            let rows = if columns == 0 {
                Vec::new()
            } else {
                cells.chunks(columns).map(<[Datum]>::to_vec).collect()
            };
            (column_names(&path, columns, explicit_names), rows)
        }
        ArrayLayout::RankN(values) => (
            column_names(&path, 1, explicit_names),
            values.into_iter().map(|v| vec![v]).collect(),
        ),
    };

    if names.is_empty() {
        return Err(normalize_error(&path, "dataset has no columns".to_string()));
    }
    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(IngestionError::DuplicateColumn {
                path: path.clone(),
                column: name.clone(),
            });
        }
    }

    Ok(typed_frame(names, rows).with_series_axis(axis))
}

fn column_names(path: &str, width: usize, explicit: Option<Vec<String>>) -> Vec<String> {
    let mut names: Vec<String> = (1..=width).map(|i| format!("Column_{i}")).collect();
    match explicit {
        Some(explicit) => {
            for (slot, name) in names.iter_mut().zip(explicit) {
                *slot = name;
            }
        }
        None if width == 1 => names[0] = base_name(path).to_string(),
        None => {}
    }
    names
}

fn typed_frame(names: Vec<String>, rows: Vec<Vec<Datum>>) -> Frame {
    let types: Vec<DataType> = (0..names.len())
        .map(|col| infer_type(rows.iter().map(|r| &r[col])))
        .collect();

    let fields = names
        .into_iter()
        .zip(&types)
        .map(|(name, t)| Field::new(name, *t))
        .collect();

    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().zip(&types).map(|(d, t)| to_value(d, *t)).collect())
        .collect();

    Frame::new(Schema::new(fields), rows)
}

fn is_missing(d: &Datum) -> bool {
    match d {
        Datum::Missing => true,
        Datum::Float(v) => v.is_nan(),
        _ => false,
    }
}

/// Column type from its cells: integers widen to float next to floats or missing values,
/// anything textual or mixed becomes text, an all-missing column is float.
fn infer_type<'a>(cells: impl Iterator<Item = &'a Datum>) -> DataType {
    let (mut ints, mut floats, mut bools, mut text, mut missing) = (false, false, false, false, false);
    for cell in cells {
        if is_missing(cell) {
            missing = true;
            continue;
        }
        match cell {
            Datum::Int(_) => ints = true,
            Datum::Float(_) => floats = true,
            Datum::Bool(_) => bools = true,
            _ => text = true,
        }
    }

    if text || (bools && (ints || floats)) {
        DataType::Utf8
    } else if bools {
        DataType::Bool
    } else if ints && !floats && !missing {
        DataType::Int64
    } else {
        DataType::Float64
    }
}

fn to_value(d: Datum, t: DataType) -> Value {
    if is_missing(&d) {
        return Value::Null;
    }
    match (t, d) {
        (DataType::Int64, Datum::Int(v)) => Value::Int64(v),
        (DataType::Float64, Datum::Int(v)) => Value::Float64(v as f64),
        (DataType::Float64, Datum::Float(v)) => Value::Float64(v),
        (DataType::Bool, Datum::Bool(v)) => Value::Bool(v),
        (DataType::Utf8, Datum::Text(s)) => Value::Utf8(s),
        (_, other) => Value::Utf8(other.to_string()),
    }
}

fn normalize_error(path: &str, message: String) -> IngestionError {
    IngestionError::Normalize {
        path: path.to_string(),
        message,
    }
}
